//! The lazy-reuse diagnostic. Kept in its own test binary because it flips
//! process-wide configuration.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use weft::config::{self, Config};
use weft::{Value, lazy, to_vec};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn traverse_with_capture(times: usize) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let seq = lazy::range_to(3);
        for _ in 0..times {
            assert_eq!(to_vec(&seq).unwrap().len(), 3);
        }
        if let Value::Lazy(s) = &seq {
            assert_eq!(s.traversals(), times);
        }
    });
    capture.contents()
}

#[test]
fn test_reuse_warning_follows_config() {
    config::set(Config { warn_on_lazy_reuse: false });
    assert!(!traverse_with_capture(2).contains("traversed again"));

    config::set(Config { warn_on_lazy_reuse: true });
    assert!(!traverse_with_capture(1).contains("traversed again"));
    let logs = traverse_with_capture(3);
    assert_eq!(logs.matches("traversed again").count(), 2);
    assert!(logs.contains("WARN"));

    config::set(Config::default());
}

#[test]
fn test_config_from_lookup() {
    let on = Config::from_lookup(|name| {
        (name == config::WARN_LAZY_REUSE_ENV).then(|| "true".to_string())
    });
    assert!(on.warn_on_lazy_reuse);
    let off = Config::from_lookup(|_| Some("0".to_string()));
    assert!(!off.warn_on_lazy_reuse);
}
