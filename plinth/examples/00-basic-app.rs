use plinth::application::Application;
use plinth_ioc::component::{ComponentInstance, ErrorPtr, Startable};
use plinth_ioc::proto::ProtoComponent;
use tracing::info;

struct Heartbeat;

impl ComponentInstance for Heartbeat {
    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }
}

impl Startable for Heartbeat {
    fn start_component(&self) -> Result<(), ErrorPtr> {
        info!("heartbeat component started");
        Ok(())
    }
}

fn main() {
    // no config sources: the framework defaults are the whole configuration
    let running = Application::new()
        .with_proto(ProtoComponent::new("heartbeat", Heartbeat))
        .boot()
        .expect("boot failed");

    info!("application is up");

    running.shutdown();
}
