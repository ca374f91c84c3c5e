/// A single script argument at the protocol boundary.
///
/// Arguments follow the server-side evaluate convention: the first element
/// is the count of key-type arguments, followed by that many keys, followed
/// by any number of plain arguments. This component passes the vector
/// through without validating its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptArg {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<i64> for ScriptArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ScriptArg {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ScriptArg {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for ScriptArg {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Raw reply produced by script execution, returned without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Int(i64),
    Data(Vec<u8>),
    Status(String),
    Array(Vec<Reply>),
}

impl Reply {
    /// View the reply as UTF-8 text, if it carries any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Data(bytes) => std::str::from_utf8(bytes).ok(),
            Self::Status(s) => Some(s),
            _ => None,
        }
    }

    /// View the reply as an integer, if it is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}
