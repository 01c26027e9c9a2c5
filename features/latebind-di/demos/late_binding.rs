use std::{sync::Arc, time::Duration};

use latebind_di::{Container, DynError, Lazy, ModuleError};
use tracing_subscriber::EnvFilter;

struct Greeter {
    greeting: String,
}
impl Greeter {
    async fn say_hello(&self) -> String {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.greeting.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), DynError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("latebind_di=debug"))
        .init();

    let container = Container::new();

    // Consumer asks for the module before anyone registered it
    let greeter: Lazy<Greeter> = container.lazy("greeter");
    let consumer = tokio::spawn(async move {
        let greeter = greeter.wait().await.map(Arc::clone).map_err(Clone::clone)?;
        Ok::<_, ModuleError>(greeter.say_hello().await)
    });

    // Compound module depending on the greeter
    let banner = tokio::spawn(container.inject_and_register("banner", ["greeter"], |deps| {
        let greeter = deps.get::<Greeter>(0)?;
        Ok::<_, ModuleError>(format!("*** {} ***", greeter.greeting))
    }));

    tokio::time::sleep(Duration::from_millis(500)).await;
    container.register(
        "greeter",
        Greeter {
            greeting: "Hello!".to_string(),
        },
    )?;

    println!("{}", consumer.await??);
    banner.await??;
    println!("{}", container.require::<String>("banner").await?);
    println!("{container:?}");

    Ok(())
}
