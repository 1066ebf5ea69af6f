use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ciphertext failed authentication")]
    Decryption,
    #[error("Ciphertext has length {0}, expected {1}")]
    CiphertextLength(usize, usize),
    #[error("Leaf index {0} is out of bounds for a tree of capacity {1}")]
    LeafIndexOutOfBounds(usize, usize),
    #[error("Sub-root range [{0}, {1}) is not a whole subtree")]
    InvalidSubrootRange(usize, usize),
    #[error("Merkle tree is full")]
    TreeFull,
    #[error("Value is not a canonical field element: {0}")]
    NotInField(String),
    #[error("Point ({0}, {1}) is not on the curve")]
    NotOnCurve(String, String),
    #[error("Malformed serialized key: {0}")]
    MalformedKey(String),
}
