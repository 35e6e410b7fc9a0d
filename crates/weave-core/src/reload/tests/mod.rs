
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, OnceLock, Weak};

    use tokio::time::Instant;

    use crate::event::LogCategory;
    use crate::feature::error::LoadError;
    use crate::kernel::error::{Error, Result};
    use crate::reload::error::ReloadError;
    use crate::reload::scheduler::{ReloadScheduler, ReloadTarget};

    /// Reload target recording when it was asked to rebuild.
    #[derive(Default)]
    pub struct MockTarget {
        pub reloads: Mutex<Vec<Instant>>,
        pub logs: Mutex<Vec<String>>,
        pub sources: Mutex<BTreeSet<PathBuf>>,
        pub fail: bool,
        /// Scheduler poked once from inside the first reload.
        pub poke_during_reload: OnceLock<Weak<ReloadScheduler>>,
    }

    impl MockTarget {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }

        pub fn reload_count(&self) -> usize {
            self.reloads.lock().unwrap().len()
        }

        pub fn reload_times(&self) -> Vec<Instant> {
            self.reloads.lock().unwrap().clone()
        }

        pub fn logs(&self) -> Vec<String> {
            self.logs.lock().unwrap().clone()
        }
    }

    impl ReloadTarget for MockTarget {
        fn reload(&self) -> Result<()> {
            let first = {
                let mut reloads = self.reloads.lock().unwrap();
                reloads.push(Instant::now());
                reloads.len() == 1
            };
            if first {
                if let Some(scheduler) = self.poke_during_reload.get().and_then(Weak::upgrade) {
                    scheduler.schedule();
                }
            }
            if self.fail {
                return Err(Error::from(ReloadError::Rebuild {
                    source: Box::new(Error::from(LoadError::InvalidDescriptor {
                        module: "mock".into(),
                        reason: "rebuild exploded".into(),
                    })),
                }));
            }
            Ok(())
        }

        fn log(&self, category: LogCategory, message: &str) {
            self.logs
                .lock()
                .unwrap()
                .push(format!("{}: {}", category, message));
        }

        fn feature_sources(&self) -> BTreeSet<PathBuf> {
            self.sources.lock().unwrap().clone()
        }
    }
}
