use clap::Parser as ClapParser;
use std::path::PathBuf;
use structured_telemetry::{
    DynamicEvent, Event, FieldValue, SessionInfo, StructuredLogger, WriterSink,
};
use tracing::error;

/// Emit a structured event line built from the command line
#[derive(Debug, clap::Parser)]
struct Opts {
    /// Session info yaml file
    #[arg(long)]
    pub session_info: Option<PathBuf>,

    /// Append lines to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Event type tag, omit for a typeless event
    #[arg(long = "type")]
    pub typ: Option<String>,

    /// Event fields, as name=value
    pub fields: Vec<String>,
}

struct CliEvent {
    typ: Option<String>,
    fields: Vec<(String, FieldValue)>,
}

impl Event for CliEvent {
    fn populate(&self, event: &mut DynamicEvent) {
        for (name, value) in self.fields.iter() {
            event.add(name, value.clone());
        }
    }

    fn event_type(&self) -> Option<&str> {
        self.typ.as_deref()
    }
}

fn parse_value(s: &str) -> FieldValue {
    if let Ok(v) = s.parse::<i64>() {
        v.into()
    } else if let Ok(v) = s.parse::<f64>() {
        v.into()
    } else if let Ok(v) = s.parse::<bool>() {
        v.into()
    } else {
        s.into()
    }
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let opts = Opts::parse();

    let info = match opts.session_info.as_ref() {
        Some(p) => SessionInfo::from_yaml_file(p).unwrap(),
        None => SessionInfo::default(),
    };

    let event = CliEvent {
        typ: opts.typ,
        fields: opts
            .fields
            .iter()
            .filter_map(|f| f.split_once('='))
            .map(|(name, value)| (name.to_owned(), parse_value(value)))
            .collect(),
    };

    let res = match opts.output.as_ref() {
        Some(p) => StructuredLogger::new(WriterSink::append(p).unwrap(), info).log_event(&event),
        None => StructuredLogger::new(WriterSink::stdout(), info).log_event(&event),
    };
    if let Err(e) = res {
        error!("{e}");
    }
}
