//! Single-threaded window host: viewport, global listeners and frame scheduling.
//!
//! Listeners are owned through [`ListenerGuard`]s and are removed when the
//! guard drops. Animation frames behave like a display refresh callback: a
//! callback runs once, on the next [`Window::run_animation_frame`], and
//! must request another frame to keep animating.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use stardrift_core::Viewport;

/// Pointer movement in cell coordinates, with the viewport it happened in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMove {
    pub column: u16,
    pub row: u16,
    pub viewport: Viewport,
}

/// Handle to a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

type PointerListener = Rc<dyn Fn(PointerMove)>;
type ResizeListener = Rc<dyn Fn(Viewport)>;
type FrameCallback = Box<dyn FnOnce(u64)>;

#[derive(Default)]
struct WindowInner {
    viewport: Viewport,
    next_id: u64,
    pointer_listeners: Vec<(u64, PointerListener)>,
    resize_listeners: Vec<(u64, ResizeListener)>,
    frames: Vec<(FrameId, FrameCallback)>,
    /// Frames cancelled while their batch was running.
    cancelled: Vec<FrameId>,
    frame_number: u64,
}

impl WindowInner {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn remove_listener(&mut self, id: u64) {
        self.pointer_listeners.retain(|(listener, _)| *listener != id);
        self.resize_listeners.retain(|(listener, _)| *listener != id);
    }
}

/// Shared handle to the host window.
#[derive(Clone)]
pub struct Window {
    inner: Rc<RefCell<WindowInner>>,
}

/// Non-owning window handle, used by callbacks the window itself stores.
#[derive(Clone)]
pub struct WeakWindow {
    inner: Weak<RefCell<WindowInner>>,
}

impl WeakWindow {
    pub fn upgrade(&self) -> Option<Window> {
        self.inner.upgrade().map(|inner| Window { inner })
    }
}

impl Window {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            inner: Rc::new(RefCell::new(WindowInner {
                viewport,
                ..Default::default()
            })),
        }
    }

    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.inner.borrow().viewport
    }

    /// Listen for pointer movement anywhere in the window.
    pub fn add_pointer_listener(&self, listener: impl Fn(PointerMove) + 'static) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        let listener: PointerListener = Rc::new(listener);
        inner.pointer_listeners.push((id, listener));
        self.guard(id)
    }

    /// Listen for viewport size changes.
    pub fn add_resize_listener(&self, listener: impl Fn(Viewport) + 'static) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        let listener: ResizeListener = Rc::new(listener);
        inner.resize_listeners.push((id, listener));
        self.guard(id)
    }

    fn guard(&self, id: u64) -> ListenerGuard {
        ListenerGuard {
            window: self.downgrade(),
            id,
        }
    }

    /// Number of registered pointer and resize listeners.
    pub fn listener_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.pointer_listeners.len() + inner.resize_listeners.len()
    }

    pub fn dispatch_pointer_move(&self, column: u16, row: u16) {
        let (listeners, viewport) = {
            let inner = self.inner.borrow();
            let listeners: Vec<PointerListener> = inner
                .pointer_listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            (listeners, inner.viewport)
        };
        let event = PointerMove {
            column,
            row,
            viewport,
        };
        for listener in listeners {
            listener(event);
        }
    }

    /// Change the viewport size, keeping its pixel ratio, and notify listeners.
    pub fn resize(&self, columns: u16, rows: u16) {
        let (listeners, viewport) = {
            let mut inner = self.inner.borrow_mut();
            inner.viewport = inner.viewport.resized(columns, rows);
            let listeners: Vec<ResizeListener> = inner
                .resize_listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            (listeners, inner.viewport)
        };
        for listener in listeners {
            listener(viewport);
        }
    }

    /// Run `callback` on the next animation frame.
    pub fn request_animation_frame(&self, callback: impl FnOnce(u64) + 'static) -> FrameId {
        let mut inner = self.inner.borrow_mut();
        let id = FrameId(inner.next_id());
        let callback: FrameCallback = Box::new(callback);
        inner.frames.push((id, callback));
        id
    }

    pub fn cancel_animation_frame(&self, id: FrameId) {
        // The callback is dropped after the borrow ends; its captures may touch the window.
        let _removed = {
            let mut inner = self.inner.borrow_mut();
            match inner.frames.iter().position(|(frame, _)| *frame == id) {
                Some(index) => Some(inner.frames.remove(index)),
                None => {
                    inner.cancelled.push(id);
                    None
                }
            }
        };
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Frames run so far.
    pub fn frame_number(&self) -> u64 {
        self.inner.borrow().frame_number
    }

    /// Run every callback queued before this call. Returns how many ran.
    pub fn run_animation_frame(&self) -> usize {
        let (batch, frame_number) = {
            let mut inner = self.inner.borrow_mut();
            inner.frame_number += 1;
            inner.cancelled.clear();
            (std::mem::take(&mut inner.frames), inner.frame_number)
        };

        let mut ran = 0;
        for (id, callback) in batch {
            if self.inner.borrow().cancelled.contains(&id) {
                continue;
            }
            callback(frame_number);
            ran += 1;
        }
        self.inner.borrow_mut().cancelled.clear();
        ran
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Window")
            .field("viewport", &inner.viewport)
            .field("pointer_listeners", &inner.pointer_listeners.len())
            .field("resize_listeners", &inner.resize_listeners.len())
            .field("pending_frames", &inner.frames.len())
            .finish()
    }
}

/// Registration of a window listener; removes it on drop.
pub struct ListenerGuard {
    window: WeakWindow,
    id: u64,
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(window) = self.window.upgrade() {
            window.inner.borrow_mut().remove_listener(self.id);
        }
    }
}
