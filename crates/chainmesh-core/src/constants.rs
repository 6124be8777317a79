pub const POW_SENTINEL: u8 = b'0';
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
