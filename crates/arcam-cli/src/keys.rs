//! Line-oriented key input: the first character of each line is the key.

use arcam_pipeline::{ControlInput, ControlSignal};
use log::warn;
use std::io::BufRead;

pub struct KeyReader<R> {
    input: R,
}

impl<R: BufRead> KeyReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Next key; an empty line reads as `'\n'`. `None` at end of input.
    pub fn next_key(&mut self) -> Option<char> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().chars().next().unwrap_or('\n')),
            Err(err) => {
                warn!("cannot read key input: {err}");
                None
            }
        }
    }
}

/// Quit on `q` or end of input, continue otherwise. Without input the loop
/// never waits.
pub struct KeyControl<R> {
    keys: Option<KeyReader<R>>,
}

impl<R: BufRead> KeyControl<R> {
    pub fn waiting(input: R) -> Self {
        Self {
            keys: Some(KeyReader::new(input)),
        }
    }

    pub fn free_running() -> Self {
        Self { keys: None }
    }
}

impl<R: BufRead> ControlInput for KeyControl<R> {
    fn poll(&mut self) -> ControlSignal {
        let Some(keys) = self.keys.as_mut() else {
            return ControlSignal::Continue;
        };
        eprintln!("[enter] next frame, q + [enter] quit");
        match keys.next_key() {
            Some('q') | Some('Q') | None => ControlSignal::Quit,
            Some(_) => ControlSignal::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_first_char_per_line() {
        let mut keys = KeyReader::new(Cursor::new("s\n\n  q  \nxyz"));
        assert_eq!(keys.next_key(), Some('s'));
        assert_eq!(keys.next_key(), Some('\n'));
        assert_eq!(keys.next_key(), Some('q'));
        assert_eq!(keys.next_key(), Some('x'));
        assert_eq!(keys.next_key(), None);
    }

    #[test]
    fn control_quits_on_q_or_eof() {
        let mut control = KeyControl::waiting(Cursor::new("\nn\nq\n"));
        assert_eq!(control.poll(), ControlSignal::Continue);
        assert_eq!(control.poll(), ControlSignal::Continue);
        assert_eq!(control.poll(), ControlSignal::Quit);

        let mut eof = KeyControl::waiting(Cursor::new(""));
        assert_eq!(eof.poll(), ControlSignal::Quit);

        let mut free = KeyControl::<Cursor<&str>>::free_running();
        assert_eq!(free.poll(), ControlSignal::Continue);
    }
}
