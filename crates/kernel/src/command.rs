use crate::world::World;

/// A deferred cross-entity effect, applied on the draining thread.
pub type Command<P> = Box<dyn FnOnce(&mut World<P>) + Send>;

/// Per-update outbox. Whatever an update pushes here is applied after every update of
/// the tick has returned.
pub struct Commands<P> {
    buf: Vec<Command<P>>,
}

impl<P> Commands<P> {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, command: impl FnOnce(&mut World<P>) + Send + 'static) {
        self.buf.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<Command<P>> {
        self.buf
    }
}

impl<P> Default for Commands<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// The single FIFO queue drained once per tick.
pub(crate) struct CommandQueue<P> {
    pending: Vec<Command<P>>,
}

impl<P> CommandQueue<P> {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, command: Command<P>) {
        self.pending.push(command);
    }

    pub(crate) fn extend(&mut self, commands: Commands<P>) {
        self.pending.extend(commands.into_inner());
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Take everything queued so far, in enqueue order. Commands queued while the taken
    /// batch runs land in the next batch.
    pub(crate) fn take(&mut self) -> Vec<Command<P>> {
        std::mem::take(&mut self.pending)
    }
}
