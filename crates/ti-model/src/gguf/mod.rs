pub mod cursor;
pub mod header;
pub mod metadata;
pub mod reader;
pub mod tensor_info;
pub mod writer;

pub use cursor::ByteCursor;
pub use header::{GgufHeader, GGUF_DEFAULT_ALIGNMENT, GGUF_MAGIC, GGUF_VERSION};
pub use metadata::{GgufMetadata, MetadataValue};
pub use reader::GgufFile;
pub use tensor_info::{GgufTensorInfo, WeightFormat};
pub use writer::GgufWriter;
