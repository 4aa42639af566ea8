use structured_telemetry::{
    ChannelSink, DynamicEvent, Error, Event, SessionInfo, StructuredLogger,
};
use tracing::info;

struct Tick {
    n: i64,
}

impl Event for Tick {
    fn populate(&self, event: &mut DynamicEvent) {
        event.add_int("n", self.n);
        event.add_bool("even", self.n % 2 == 0);
    }

    fn event_type(&self) -> Option<&str> {
        Some("tick")
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let (sink, rx) = ChannelSink::new();
    let forwarder = tokio::spawn(rx.forward(tokio::io::stdout()));

    let logger = StructuredLogger::new(sink, SessionInfo::default());
    for n in 0..10 {
        logger.log_event(&Tick { n })?;
    }
    drop(logger);

    let count = forwarder.await.map_err(std::io::Error::other)??;
    info!(count, "Forwarded event lines");

    Ok(())
}
