//! The editor host seam: open editors, keyup listeners, named commands.

use crate::types::{Command, EditorId, InputEvent, KeyEvent};
use crossbeam_channel::Sender;
use log::{debug, trace};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// What the plugin needs from the editor it lives in.
pub trait Host {
    fn text_editors(&self) -> Vec<EditorId>;

    /// Deliver `editor`'s keyups to `tx` until the subscription is disposed.
    fn add_keyup_listener(&self, editor: EditorId, tx: Sender<InputEvent>) -> Subscription;

    /// Deliver keyups from every editor to `tx`, including editors opened
    /// after this call, until disposed.
    fn observe_text_editors(&self, tx: Sender<InputEvent>) -> Subscription;

    /// Deliver dispatched plugin commands to `tx` until disposed.
    fn add_commands(&self, tx: Sender<InputEvent>) -> Subscription;
}

/// Cancellation handle returned by every `Host` subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Runs the cancel action. Later calls do nothing.
    pub fn dispose(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_none()
    }
}

/// A group of subscriptions torn down together.
#[derive(Default)]
pub struct Disposables {
    subs: Vec<Subscription>,
}

impl Disposables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sub: Subscription) {
        self.subs.push(sub);
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn dispose(&mut self) {
        for mut sub in self.subs.drain(..) {
            sub.dispose();
        }
    }
}

#[derive(Default)]
struct HostState {
    next_editor: u32,
    next_listener: u64,
    editors: BTreeMap<EditorId, Vec<(u64, Sender<InputEvent>)>>,
    commands: Vec<(u64, Sender<InputEvent>)>,
    /// Listeners attached to every editor, present and future
    observers: Vec<(u64, Sender<InputEvent>)>,
}

/// In-process editor host. Clones share state, so a typing thread and the
/// coordinator can hold the same host.
#[derive(Clone, Default)]
pub struct EditorHost {
    state: Arc<Mutex<HostState>>,
}

impl EditorHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_editor(&self) -> EditorId {
        let mut st = self.state.lock().unwrap();
        let id = EditorId(st.next_editor);
        st.next_editor += 1;
        let listeners = st.observers.clone();
        st.editors.insert(id, listeners);
        debug!("Opened {}", id);
        id
    }

    /// Closing an editor drops its listeners.
    pub fn close_editor(&self, editor: EditorId) {
        self.state.lock().unwrap().editors.remove(&editor);
    }

    /// Fire a keyup in `editor`. Returns how many listeners received it.
    pub fn keyup(&self, editor: EditorId, code: Option<i64>) -> usize {
        // Senders are cloned out so a full channel never blocks while the lock is held
        let listeners: Vec<Sender<InputEvent>> = match self.state.lock().unwrap().editors.get(&editor) {
            Some(l) => l.iter().map(|(_, tx)| tx.clone()).collect(),
            None => return 0,
        };
        trace!("keyup {:?} in {}", code, editor);
        let event = InputEvent::Key(KeyEvent { editor, code });
        listeners
            .iter()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Dispatch a plugin command. Returns how many listeners received it.
    pub fn dispatch(&self, command: Command) -> usize {
        let listeners: Vec<Sender<InputEvent>> = self
            .state
            .lock()
            .unwrap()
            .commands
            .iter()
            .map(|(_, tx)| tx.clone())
            .collect();
        debug!("dispatch {}", command.name());
        listeners
            .iter()
            .filter(|tx| tx.send(InputEvent::Command(command)).is_ok())
            .count()
    }

    pub fn keyup_listener_count(&self) -> usize {
        self.state.lock().unwrap().editors.values().map(Vec::len).sum()
    }

    pub fn command_listener_count(&self) -> usize {
        self.state.lock().unwrap().commands.len()
    }
}

impl Host for EditorHost {
    fn text_editors(&self) -> Vec<EditorId> {
        self.state.lock().unwrap().editors.keys().copied().collect()
    }

    fn add_keyup_listener(&self, editor: EditorId, tx: Sender<InputEvent>) -> Subscription {
        let id = {
            let mut st = self.state.lock().unwrap();
            let id = st.next_listener;
            st.next_listener += 1;
            if let Some(listeners) = st.editors.get_mut(&editor) {
                listeners.push((id, tx));
            }
            id
        };
        let state = Arc::clone(&self.state);
        Subscription::new(move || {
            if let Some(listeners) = state.lock().unwrap().editors.get_mut(&editor) {
                listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn observe_text_editors(&self, tx: Sender<InputEvent>) -> Subscription {
        let id = {
            let mut st = self.state.lock().unwrap();
            let id = st.next_listener;
            st.next_listener += 1;
            for listeners in st.editors.values_mut() {
                listeners.push((id, tx.clone()));
            }
            st.observers.push((id, tx));
            id
        };
        let state = Arc::clone(&self.state);
        Subscription::new(move || {
            let mut st = state.lock().unwrap();
            st.observers.retain(|(lid, _)| *lid != id);
            for listeners in st.editors.values_mut() {
                listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn add_commands(&self, tx: Sender<InputEvent>) -> Subscription {
        let id = {
            let mut st = self.state.lock().unwrap();
            let id = st.next_listener;
            st.next_listener += 1;
            st.commands.push((id, tx));
            id
        };
        let state = Arc::clone(&self.state);
        Subscription::new(move || {
            state.lock().unwrap().commands.retain(|(lid, _)| *lid != id);
        })
    }
}
