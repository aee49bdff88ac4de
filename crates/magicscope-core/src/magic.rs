use std::ffi::{CStr, CString, c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use magicscope_ffi as ffi;
use tracing::{debug, warn};

use crate::database::{DatabaseList, path_bytes};
use crate::error::{EngineError, MagicError, Result};
use crate::flags::Flags;
use crate::param::Param;

type DatabaseFn = unsafe extern "C" fn(ffi::magic_t, *const c_char) -> c_int;

/// An open libmagic handle.
///
/// One handle wraps one native context with its own scratch buffers and
/// error slot. It can move between threads but not be shared; use
/// [`MagicPool`](crate::MagicPool) for concurrent classification.
///
/// The native state is released exactly once, by [`Magic::close`] or on drop.
#[derive(Debug)]
pub struct Magic {
    cookie: NonNull<ffi::magic_set>,
    flags: Flags,
    databases: DatabaseList,
    startup_warning: Option<MagicError>,
}

// SAFETY: a magic_set is only touched through `&mut self` or through the
// read-only getters below, and `Magic` is not `Sync`, so no two threads can
// reach the same cookie at once.
unsafe impl Send for Magic {}

impl Magic {
    /// Open a handle and load the default database.
    ///
    /// A failing default load does not fail the open. It is logged and kept
    /// in [`Magic::startup_warning`]; classify calls then report the
    /// engine's own error.
    pub fn open(flags: Flags) -> Result<Self> {
        let flags = Flags::NONE | flags;
        let raw = unsafe { ffi::magic_open(flags.bits()) };
        let cookie = NonNull::new(raw).ok_or_else(|| {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            MagicError::Init(EngineError::new(errno, "magic_open returned no handle"))
        })?;
        debug!(flags = %flags, "opened magic handle");

        let mut magic = Self {
            cookie,
            flags,
            databases: DatabaseList::Default,
            startup_warning: None,
        };
        if let Err(e) = magic.load(&DatabaseList::Default) {
            warn!("default magic database failed to load: {e}");
            magic.startup_warning = Some(e);
        }
        Ok(magic)
    }

    /// Release the native handle.
    pub fn close(self) {
        debug!("closing magic handle");
        drop(self);
    }

    // ─── Databases ─────────────────────────────────────────

    /// Replace the active databases. [`DatabaseList::Default`] restores the
    /// default database.
    ///
    /// After a failed load the engine's database state is unspecified; retry
    /// with corrected input or drop the handle.
    pub fn load(&mut self, databases: &DatabaseList) -> Result<()> {
        self.database_call(databases, ffi::magic_load, |target, source| {
            MagicError::Load { target, source }
        })?;
        debug!(databases = %databases.describe(), "loaded magic database");
        self.databases = databases.clone();
        Ok(())
    }

    /// Compile each source file to `<basename>.mgc` in the current working
    /// directory. The active database is unchanged.
    pub fn compile(&mut self, databases: &DatabaseList) -> Result<Vec<PathBuf>> {
        self.database_call(databases, ffi::magic_compile, |target, source| {
            MagicError::Compile { target, source }
        })?;
        let outputs = databases.compiled_outputs();
        debug!(databases = %databases.describe(), outputs = outputs.len(), "compiled magic database");
        Ok(outputs)
    }

    /// Validate database entries. Diagnostics go to stderr.
    pub fn check(&mut self, databases: &DatabaseList) -> Result<()> {
        self.database_call(databases, ffi::magic_check, |target, source| {
            MagicError::Validation { target, source }
        })?;
        debug!(databases = %databases.describe(), "magic database check passed");
        Ok(())
    }

    /// Dump all entries to stdout, binary entries first, then text entries.
    pub fn list(&mut self, databases: &DatabaseList) -> Result<()> {
        self.database_call(databases, ffi::magic_list, |target, source| {
            MagicError::List { target, source }
        })
    }

    /// Databases of the last successful [`Magic::load`].
    pub fn databases(&self) -> &DatabaseList {
        &self.databases
    }

    /// Failure of the implicit default load performed by [`Magic::open`].
    pub fn startup_warning(&self) -> Option<&MagicError> {
        self.startup_warning.as_ref()
    }

    fn database_call(
        &mut self,
        databases: &DatabaseList,
        call: DatabaseFn,
        wrap: fn(String, EngineError) -> MagicError,
    ) -> Result<()> {
        let list = databases.to_c_string()?;
        let list_ptr = list.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        let status = unsafe { call(self.cookie.as_ptr(), list_ptr) };
        if status != 0 {
            return Err(wrap(databases.describe(), self.last_error()));
        }
        Ok(())
    }

    // ─── Classification ────────────────────────────────────

    /// Describe the content of `buffer` under the current flags.
    pub fn buffer(&mut self, buffer: &[u8]) -> Result<String> {
        if buffer.is_empty() {
            return Err(MagicError::Classify {
                target: "buffer".to_string(),
                source: EngineError::new(0, "buffer is empty"),
            });
        }
        let result =
            unsafe { ffi::magic_buffer(self.cookie.as_ptr(), buffer.as_ptr().cast(), buffer.len()) };
        self.take_result(result, || format!("buffer of {} bytes", buffer.len()))
    }

    /// Describe the file at `path` under the current flags.
    pub fn file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let c_path = path_to_c_string(path)?;
        let result = unsafe { ffi::magic_file(self.cookie.as_ptr(), c_path.as_ptr()) };
        self.take_result(result, || path.display().to_string())
    }

    fn take_result(
        &self,
        result: *const c_char,
        target: impl FnOnce() -> String,
    ) -> Result<String> {
        match unsafe { owned_string(result) } {
            Some(description) => Ok(description),
            None => Err(MagicError::Classify {
                target: target(),
                source: self.last_error(),
            }),
        }
    }

    // ─── Flags / params ────────────────────────────────────

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Replace the active flags. Fails where the platform can't honor a
    /// flag, e.g. `PRESERVE_ATIME` without utime(3)/utimes(2).
    pub fn set_flags(&mut self, flags: Flags) -> Result<()> {
        let status = unsafe { ffi::magic_setflags(self.cookie.as_ptr(), flags.bits()) };
        if status == -1 {
            return Err(MagicError::Flag {
                flags: flags.bits(),
                source: self.last_error(),
            });
        }
        debug!(flags = %flags, "set magic flags");
        self.flags = flags;
        Ok(())
    }

    pub fn param(&self, param: Param) -> Result<usize> {
        let mut value: usize = 0;
        let status = unsafe {
            ffi::magic_getparam(
                self.cookie.as_ptr(),
                param.id(),
                (&mut value as *mut usize).cast(),
            )
        };
        if status != 0 {
            return Err(self.param_error(param));
        }
        Ok(value)
    }

    pub fn set_param(&mut self, param: Param, value: usize) -> Result<()> {
        let status = unsafe {
            ffi::magic_setparam(
                self.cookie.as_ptr(),
                param.id(),
                (&value as *const usize).cast(),
            )
        };
        if status != 0 {
            return Err(self.param_error(param));
        }
        debug!(%param, value, "set magic param");
        Ok(())
    }

    /// [`Magic::param`] by raw id. Unknown ids fail with [`MagicError::Param`].
    pub fn param_by_id(&self, id: i32) -> Result<usize> {
        self.param(Param::try_from(id)?)
    }

    /// [`Magic::set_param`] by raw id. Unknown ids fail with [`MagicError::Param`].
    pub fn set_param_by_id(&mut self, id: i32, value: usize) -> Result<()> {
        self.set_param(Param::try_from(id)?, value)
    }

    fn param_error(&self, param: Param) -> MagicError {
        let mut source = self.last_error();
        if source.message.is_empty() {
            source.message = "not supported by this libmagic".to_string();
        }
        MagicError::Param {
            param: param.name().to_string(),
            source,
        }
    }

    // ─── Error state ───────────────────────────────────────

    /// OS error number of the last failing call, or zero.
    pub fn errno(&self) -> i32 {
        unsafe { ffi::magic_errno(self.cookie.as_ptr()) }
    }

    /// Message of the last failing call, or `None`.
    pub fn error(&self) -> Option<String> {
        unsafe { owned_string(ffi::magic_error(self.cookie.as_ptr())) }
    }

    fn last_error(&self) -> EngineError {
        EngineError::new(self.errno(), self.error().unwrap_or_default())
    }

    // ─── Library info ──────────────────────────────────────

    /// libmagic build version, e.g. `545`.
    pub fn version() -> i32 {
        unsafe { ffi::magic_version() }
    }

    /// [`Magic::version`] as `major.minor`, e.g. `5.45`.
    pub fn version_string() -> String {
        let version = Self::version();
        format!("{}.{:02}", version / 100, version % 100)
    }

    /// Path of the database libmagic loads by default (honors `$MAGIC`).
    pub fn default_database_path() -> Option<String> {
        unsafe { owned_string(ffi::magic_getpath(ptr::null(), 0)) }
    }
}

impl Drop for Magic {
    fn drop(&mut self) {
        unsafe { ffi::magic_close(self.cookie.as_ptr()) };
    }
}

/// Copy a libmagic-owned C string; `None` for null.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays
/// valid until this returns.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn path_to_c_string(path: &Path) -> Result<CString> {
    CString::new(path_bytes(path))
        .map_err(|_| MagicError::InvalidPath(path.to_string_lossy().into_owned()))
}
