//! Two-way bound host state.
//!
//! A [`Binding`] is shared between the host and the coordinator: the host
//! reads it to build the next declaration, the coordinator writes back into it
//! when the renderer changes the value on its own (for instance when a user
//! gesture idles the viewport).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::runtime::RuntimeHandle;

struct BindingInner<T> {
    value: RefCell<T>,
    writes: Cell<usize>,
    runtime: Option<RuntimeHandle>,
}

pub struct Binding<T> {
    inner: Rc<BindingInner<T>>, // FUTURE(no_std): replace Rc with arena-managed state handles.
}

impl<T> PartialEq for Binding<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Binding<T> {}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Binding<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                value: RefCell::new(value),
                writes: Cell::new(0),
                runtime: None,
            }),
        }
    }

    /// A binding whose writes ask the runtime for another host turn.
    pub fn with_runtime(value: T, runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                value: RefCell::new(value),
                writes: Cell::new(0),
                runtime: Some(runtime),
            }),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut value = self.inner.value.borrow_mut();
            f(&mut value)
        };
        self.notify_write();
        result
    }

    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify_write();
    }

    /// Number of writes since creation.
    pub fn write_count(&self) -> usize {
        self.inner.writes.get()
    }

    fn notify_write(&self) {
        self.inner.writes.set(self.inner.writes.get() + 1);
        if let Some(runtime) = &self.inner.runtime {
            runtime.schedule();
        }
    }
}

impl<T: Clone> Binding<T> {
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}
