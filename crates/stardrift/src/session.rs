//! Terminal modes that must be undone however the app exits.

use std::io::Write;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;

/// Run `body` with mouse capture enabled on `out`.
///
/// Capture is disabled afterwards even when enabling it failed; `body`
/// only runs if enabling succeeded.
pub fn with_mouse_capture<W, T>(
    out: &mut W,
    body: impl FnOnce() -> color_eyre::Result<T>,
) -> color_eyre::Result<T>
where
    W: Write,
{
    let result = execute!(out, EnableMouseCapture)
        .map_err(color_eyre::Report::from)
        .and_then(|()| body());
    let _ = execute!(out, DisableMouseCapture);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    /// A terminal that rejects every write.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("terminal gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("terminal gone"))
        }
    }

    #[test]
    fn test_capture_wraps_body() {
        let mut out = Vec::new();
        let value = with_mouse_capture(&mut out, || Ok(7)).unwrap();
        assert_eq!(value, 7);
        let written = String::from_utf8(out).unwrap();
        let enabled = written.find("?1000h").unwrap();
        let disabled = written.find("?1000l").unwrap();
        assert!(enabled < disabled);
    }

    #[test]
    fn test_capture_is_released_when_body_fails() {
        let mut out = Vec::new();
        let result: color_eyre::Result<()> =
            with_mouse_capture(&mut out, || Err(color_eyre::eyre::eyre!("boom")));
        assert!(result.is_err());
        assert!(String::from_utf8(out).unwrap().contains("?1000l"));
    }

    #[test]
    fn test_failed_enable_skips_body_and_returns_error() {
        let ran = Cell::new(false);
        let result = with_mouse_capture(&mut Broken, || {
            ran.set(true);
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran.get());
    }
}
