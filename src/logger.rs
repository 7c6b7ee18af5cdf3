use log::{
    kv::{self, Key, Source, Value, VisitSource},
    LevelFilter, Log, Metadata, Record, SetLoggerError,
};

struct DealershipLogger;

#[derive(Default)]
struct Pairs(String);

impl<'kvs> VisitSource<'kvs> for Pairs {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.0.push_str(&format!(" {}={}", key, value));
        Ok(())
    }
}

impl Log for DealershipLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut pairs = Pairs::default();
            let _ = record.key_values().visit(&mut pairs);
            eprintln!("{} - {}{}", record.level(), record.args(), pairs.0);
        }
    }

    fn flush(&self) {}
}

static LOGGER: DealershipLogger = DealershipLogger;

/// Map the `-v` count to a level filter; warnings always get through.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Install the stderr logger; stdout stays reserved for command output.
pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level_for(verbosity)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Debug);
    }

    #[test]
    fn key_values_render_after_the_message() {
        let mut pairs = Pairs::default();
        let source: &[(&str, i32)] = &[("car_id", 3), ("sale_id", 9)];
        Source::visit(source, &mut pairs).unwrap();
        assert_eq!(pairs.0, " car_id=3 sale_id=9");
    }
}
