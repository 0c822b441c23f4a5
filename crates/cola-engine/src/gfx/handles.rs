use std::fmt;
use std::num::NonZeroU32;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Raw integer id. Never 0; 0 is reserved for "unbound".
            pub fn raw(self) -> u32 {
                self.0.get()
            }

            pub(crate) fn from_id(id: NonZeroU32) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($what, " #{}"), self.0)
            }
        }
    };
}

handle!(
    /// GPU buffer object.
    BufferHandle,
    "buffer"
);
handle!(
    /// Vertex array object: attribute layout plus the buffers feeding it.
    VertexArrayHandle,
    "vertex array"
);
handle!(
    /// Shader object (one stage, one source).
    ShaderHandle,
    "shader"
);
handle!(
    /// Program object linking a vertex and a fragment shader.
    ProgramHandle,
    "program"
);

/// Hands out ids for every object kind from one counter.
#[derive(Debug)]
pub(crate) struct HandleAllocator {
    next: NonZeroU32,
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> NonZeroU32 {
        let id = self.next;
        self.next = id.checked_add(1).unwrap_or(NonZeroU32::MIN);
        id
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next: NonZeroU32::MIN }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut ids = HandleAllocator::default();
        let a = BufferHandle::from_id(ids.next());
        let b = ProgramHandle::from_id(ids.next());
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(a.to_string(), "buffer #1");
        assert_eq!(b.to_string(), "program #2");
    }
}
