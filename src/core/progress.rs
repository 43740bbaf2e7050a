// ─── Progress Callback ───
// Status / progress / max slots shared by every installer. Any slot may be
// left unset; calling it is then a no-op.

use std::fmt;

type StatusFn = Box<dyn Fn(&str) + Send + Sync>;
type CounterFn = Box<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
pub struct ProgressCallback {
    status: Option<StatusFn>,
    progress: Option<CounterFn>,
    max: Option<CounterFn>,
}

impl ProgressCallback {
    /// A callback with every slot unset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_status(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.status = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_max(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.max = Some(Box::new(f));
        self
    }

    pub fn set_status(&self, text: &str) {
        if let Some(f) = &self.status {
            f(text);
        }
    }

    pub fn set_progress(&self, current: u64) {
        if let Some(f) = &self.progress {
            f(current);
        }
    }

    pub fn set_max(&self, total: u64) {
        if let Some(f) = &self.max {
            f(total);
        }
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCallback")
            .field("status", &self.status.is_some())
            .field("progress", &self.progress.is_some())
            .field("max", &self.max.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn unset_slots_are_noops() {
        let callback = ProgressCallback::new();
        callback.set_status("nothing listens");
        callback.set_progress(3);
        callback.set_max(10);
    }

    #[test]
    fn set_slots_receive_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let status_seen = seen.clone();
        let max_seen = seen.clone();

        let callback = ProgressCallback::new()
            .on_status(move |s| status_seen.lock().unwrap().push(format!("status:{s}")))
            .on_max(move |m| max_seen.lock().unwrap().push(format!("max:{m}")));

        callback.set_status("Download mrpack files");
        callback.set_max(2);
        callback.set_progress(1);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["status:Download mrpack files", "max:2"]
        );
    }
}
