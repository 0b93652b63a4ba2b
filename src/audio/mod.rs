/// Audio track manifest assembly.
pub mod tracks;
