use std::{
    alloc::{alloc, Layout},
    error::Error,
    fmt,
};

/// Returned when a heap node could not be allocated. Carries the value that
/// was supposed to be stored so the caller decides what to do with it.
pub struct AllocError<T>(pub T);

impl<T> AllocError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for AllocError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocError")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> fmt::Display for AllocError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes for a queue node",
            std::mem::size_of::<T>()
        )
    }
}

impl<T> Error for AllocError<T> {}

/// Like `Box::new`, but hands the value back instead of aborting when the
/// global allocator returns null.
pub fn try_box<T>(value: T) -> Result<Box<T>, T> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    unsafe {
        let ptr = alloc(layout) as *mut T;

        if ptr.is_null() {
            return Err(value);
        }

        ptr.write(value);
        // same allocator and layout `Box` would use, so `Box` may free it
        Ok(Box::from_raw(ptr))
    }
}
