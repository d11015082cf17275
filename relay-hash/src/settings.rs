// Copyright (c) 2022 MASSA LABS <info@massa.net>

/// Hash size
pub const HASH_SIZE_BYTES: usize = 32;
