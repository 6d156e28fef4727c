#[derive(Debug)]
pub enum ContainerError {
    Io(std::io::Error),
    BadHeader,
    TooSmall,
    Codec(bincode::Error),
    DuplicatePathId(i64),
    MissingRecord(i64),
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerError::Io(err) => write!(f, "I/O error: {err}"),
            ContainerError::BadHeader => write!(f, "bad container header"),
            ContainerError::TooSmall => write!(f, "container is truncated"),
            ContainerError::Codec(err) => write!(f, "record codec error: {err}"),
            ContainerError::DuplicatePathId(id) => write!(f, "path id {id} is already in use"),
            ContainerError::MissingRecord(id) => write!(f, "no record with path id {id}"),
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Io(err) => Some(err),
            ContainerError::Codec(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ContainerError {
    fn from(value: std::io::Error) -> Self {
        ContainerError::Io(value)
    }
}

impl From<bincode::Error> for ContainerError {
    fn from(value: bincode::Error) -> Self {
        ContainerError::Codec(value)
    }
}

#[derive(Debug)]
pub enum PatchError {
    /// A required anchor record could not be found by name.
    LookupFailure(String),
    MissingField(String),
    FieldType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The asset graph does not follow the layout the engine relies on.
    Structural(String),
    Unresolved(String),
    DanglingPointer {
        record: i64,
        field: String,
        target: i64,
    },
    UnsupportedTextureFormat(i32),
    Container(ContainerError),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Image(image::ImageError),
    Io(std::io::Error),
    Message(String),
}

impl PatchError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        PatchError::Message(msg.into())
    }
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::LookupFailure(what) => write!(f, "lookup failed: {what}"),
            PatchError::MissingField(path) => write!(f, "missing field '{path}'"),
            PatchError::FieldType {
                path,
                expected,
                found,
            } => write!(f, "field '{path}' is {found}, expected {expected}"),
            PatchError::Structural(msg) => write!(f, "unexpected asset layout: {msg}"),
            PatchError::Unresolved(msg) => write!(f, "unresolved pointer: {msg}"),
            PatchError::DanglingPointer {
                record,
                field,
                target,
            } => write!(
                f,
                "record {record} field '{field}' points at missing path id {target}"
            ),
            PatchError::UnsupportedTextureFormat(format) => {
                write!(f, "texture format {format} cannot be encoded")
            }
            PatchError::Container(err) => write!(f, "container error: {err}"),
            PatchError::Json(err) => write!(f, "JSON error: {err}"),
            PatchError::Yaml(err) => write!(f, "YAML error: {err}"),
            PatchError::Image(err) => write!(f, "image decode error: {err}"),
            PatchError::Io(err) => write!(f, "I/O error: {err}"),
            PatchError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Container(err) => Some(err),
            PatchError::Json(err) => Some(err),
            PatchError::Yaml(err) => Some(err),
            PatchError::Image(err) => Some(err),
            PatchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContainerError> for PatchError {
    fn from(value: ContainerError) -> Self {
        PatchError::Container(value)
    }
}

impl From<serde_json::Error> for PatchError {
    fn from(value: serde_json::Error) -> Self {
        PatchError::Json(value)
    }
}

impl From<serde_yaml::Error> for PatchError {
    fn from(value: serde_yaml::Error) -> Self {
        PatchError::Yaml(value)
    }
}

impl From<image::ImageError> for PatchError {
    fn from(value: image::ImageError) -> Self {
        PatchError::Image(value)
    }
}

impl From<std::io::Error> for PatchError {
    fn from(value: std::io::Error) -> Self {
        PatchError::Io(value)
    }
}
