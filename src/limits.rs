//! Size quotas applied while encoding and decoding.

use crate::error::QuotaError;

/// Sentinel meaning "no limit" for any quota.
pub const NO_LIMIT: usize = usize::MAX;

/// Default bound on object and container nesting while decoding.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Quotas for one [`crate::Serializer`].
///
/// `max_field_bytes` and `max_container_len` are checked against untrusted lengths the moment
/// they are read, before anything is allocated from them. `max_message_bytes` is checked after a
/// complete encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_message_bytes: usize,
    pub max_field_bytes: usize,
    pub max_container_len: usize,
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_message_bytes: NO_LIMIT,
            max_field_bytes: NO_LIMIT,
            max_container_len: NO_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Limits {
    /// No quota at all, including nesting depth.
    pub const fn unlimited() -> Self {
        Limits {
            max_message_bytes: NO_LIMIT,
            max_field_bytes: NO_LIMIT,
            max_container_len: NO_LIMIT,
            max_depth: NO_LIMIT,
        }
    }

    pub const fn with_max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = limit;
        self
    }

    pub const fn with_max_field_bytes(mut self, limit: usize) -> Self {
        self.max_field_bytes = limit;
        self
    }

    pub const fn with_max_container_len(mut self, limit: usize) -> Self {
        self.max_container_len = limit;
        self
    }

    pub const fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    #[inline]
    pub fn check_field_bytes(&self, size: usize) -> Result<(), QuotaError> {
        if size > self.max_field_bytes {
            return Err(QuotaError::FieldBytes {
                size,
                limit: self.max_field_bytes,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn check_container_len(&self, count: usize) -> Result<(), QuotaError> {
        if count > self.max_container_len {
            return Err(QuotaError::ContainerLength {
                count,
                limit: self.max_container_len,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn check_message_bytes(&self, size: usize) -> Result<(), QuotaError> {
        if size > self.max_message_bytes {
            return Err(QuotaError::MessageBytes {
                size,
                limit: self.max_message_bytes,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn check_depth(&self, depth: usize) -> Result<(), QuotaError> {
        if depth > self.max_depth {
            return Err(QuotaError::Depth {
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}
