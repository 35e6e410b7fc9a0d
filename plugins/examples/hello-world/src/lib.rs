//! Example feature: prints a greeting when the program starts.
use std::io::Write;
use std::sync::Arc;

use weave_core::event::{handler, EventBus, EventData, START};
use weave_core::feature::{Feature, FeatureDescriptor, FeatureModule, ModuleContext};

pub const MODULE_NAME: &str = "hello_world";
pub const FEATURE_NAME: &str = "weave.helloworld";
pub const GREETING: &str = "Hello, world!";

/// Where the greeting goes.
pub type Output = Arc<dyn Fn(&str) + Send + Sync>;

pub struct HelloWorld {
    output: Output,
}

impl HelloWorld {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

fn stdout() -> Output {
    Arc::new(|line: &str| {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            log::error!("Cannot write greeting: {}", e);
        }
    })
}

impl Feature for HelloWorld {
    fn descriptor(&self) -> FeatureDescriptor {
        let output = Arc::clone(&self.output);
        FeatureDescriptor::new(FEATURE_NAME).implement(
            START,
            handler(move |_bus: &EventBus, _data: &EventData| output(GREETING)),
        )
    }
}

/// The `hello_world` feature module.
pub fn module() -> FeatureModule {
    FeatureModule::new(MODULE_NAME, |_ctx: &mut ModuleContext<'_>| {
        Ok(Arc::new(HelloWorld::new(stdout())) as Arc<dyn Feature>)
    })
    .with_source(concat!(env!("CARGO_MANIFEST_DIR"), "/src/lib.rs"))
}
