pub mod concurrent_reader;
pub mod observation_reader;
pub mod payload_reader;

pub use concurrent_reader::{ConcurrentReader, InputFormat};
pub use observation_reader::ObservationReader;
pub use payload_reader::PayloadReader;
