pub mod compression;
pub mod frame;
pub mod wire;

pub use compression::{
    DEFAULT_COMPRESSION_LEVEL, MAX_DECOMPRESSED_LEN, compress, compressing_writer, decompress,
    decompress_bounded, decompressing_reader,
};
pub use frame::{FrameGeneration, PassivationFrame};
pub use wire::{UNKNOWN_LEGACY_TYPE, decode_frame, encode_frame, encode_frame_to_vec, read_frame};
