//! Magicscope FFI — raw bindings to libmagic.
//!
//! Declarations mirror `magic.h`. Everything here is `unsafe` to call;
//! `magicscope-core` wraps it in a safe handle type.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};

/// Opaque libmagic state (`struct magic_set`).
#[repr(C)]
pub struct magic_set {
    _private: [u8; 0],
}

/// The cookie handed out by `magic_open`.
pub type magic_t = *mut magic_set;

// ─── Flags ──────────────────────────────────────────────────

pub const MAGIC_NONE: c_int = 0x0000000;
pub const MAGIC_DEBUG: c_int = 0x0000001;
pub const MAGIC_SYMLINK: c_int = 0x0000002;
pub const MAGIC_COMPRESS: c_int = 0x0000004;
pub const MAGIC_DEVICES: c_int = 0x0000008;
pub const MAGIC_MIME_TYPE: c_int = 0x0000010;
pub const MAGIC_CONTINUE: c_int = 0x0000020;
pub const MAGIC_CHECK: c_int = 0x0000040;
pub const MAGIC_PRESERVE_ATIME: c_int = 0x0000080;
pub const MAGIC_RAW: c_int = 0x0000100;
pub const MAGIC_ERROR: c_int = 0x0000200;
pub const MAGIC_MIME_ENCODING: c_int = 0x0000400;
pub const MAGIC_MIME: c_int = MAGIC_MIME_TYPE | MAGIC_MIME_ENCODING;
pub const MAGIC_APPLE: c_int = 0x0000800;
pub const MAGIC_EXTENSION: c_int = 0x1000000;
pub const MAGIC_COMPRESS_TRANSP: c_int = 0x2000000;
pub const MAGIC_NODESC: c_int = MAGIC_EXTENSION | MAGIC_MIME | MAGIC_APPLE;

pub const MAGIC_NO_CHECK_COMPRESS: c_int = 0x0001000;
pub const MAGIC_NO_CHECK_TAR: c_int = 0x0002000;
pub const MAGIC_NO_CHECK_SOFT: c_int = 0x0004000;
pub const MAGIC_NO_CHECK_APPTYPE: c_int = 0x0008000;
pub const MAGIC_NO_CHECK_ELF: c_int = 0x0010000;
pub const MAGIC_NO_CHECK_TEXT: c_int = 0x0020000;
pub const MAGIC_NO_CHECK_CDF: c_int = 0x0040000;
pub const MAGIC_NO_CHECK_TOKENS: c_int = 0x0100000;
pub const MAGIC_NO_CHECK_ENCODING: c_int = 0x0200000;

// ─── Params ─────────────────────────────────────────────────

pub const MAGIC_PARAM_INDIR_MAX: c_int = 0;
pub const MAGIC_PARAM_NAME_MAX: c_int = 1;
pub const MAGIC_PARAM_ELF_PHNUM_MAX: c_int = 2;
pub const MAGIC_PARAM_ELF_SHNUM_MAX: c_int = 3;
pub const MAGIC_PARAM_ELF_NOTES_MAX: c_int = 4;
pub const MAGIC_PARAM_REGEX_MAX: c_int = 5;
pub const MAGIC_PARAM_BYTES_MAX: c_int = 6;

// ─── Functions ──────────────────────────────────────────────

unsafe extern "C" {
    pub fn magic_open(flags: c_int) -> magic_t;
    pub fn magic_close(cookie: magic_t);

    pub fn magic_getpath(magicfile: *const c_char, action: c_int) -> *const c_char;
    pub fn magic_file(cookie: magic_t, filename: *const c_char) -> *const c_char;
    pub fn magic_buffer(cookie: magic_t, buffer: *const c_void, length: usize) -> *const c_char;

    pub fn magic_error(cookie: magic_t) -> *const c_char;
    pub fn magic_setflags(cookie: magic_t, flags: c_int) -> c_int;

    pub fn magic_version() -> c_int;
    pub fn magic_load(cookie: magic_t, filename: *const c_char) -> c_int;
    pub fn magic_compile(cookie: magic_t, filename: *const c_char) -> c_int;
    pub fn magic_check(cookie: magic_t, filename: *const c_char) -> c_int;
    pub fn magic_list(cookie: magic_t, filename: *const c_char) -> c_int;
    pub fn magic_errno(cookie: magic_t) -> c_int;

    pub fn magic_setparam(cookie: magic_t, param: c_int, value: *const c_void) -> c_int;
    pub fn magic_getparam(cookie: magic_t, param: c_int, value: *mut c_void) -> c_int;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_flags() {
        assert_eq!(MAGIC_MIME, 0x0000410);
        assert_eq!(MAGIC_NODESC, 0x1000c10);
    }

    #[test]
    fn test_version_is_linked() {
        let version = unsafe { magic_version() };
        assert!(version >= 500, "unexpected libmagic version {version}");
    }
}
