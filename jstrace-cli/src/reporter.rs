//! 端末への出力

use jstrace_core::{Reporter, TraceLine};
use std::io::{self, Stderr, Stdout, Write};

const SPINNER: [char; 4] = ['/', '-', '\\', '|'];

/// 何ステップごとにスピナーを進めるか
const SPINNER_STEP: usize = 10;

/// トレース行を標準出力へ、設置の進捗を標準エラーへ書く
pub struct ConsoleReporter<O = Stdout, E = Stderr> {
    out: O,
    err: E,
    /// 進捗を表示しない
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self::with_writers(io::stdout(), io::stderr(), quiet)
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn with_writers(out: O, err: E, quiet: bool) -> Self {
        Self { out, err, quiet }
    }

    fn draw_progress(&mut self, installed: usize, total: usize) -> io::Result<()> {
        let glyph = SPINNER[(installed / SPINNER_STEP) % SPINNER.len()];
        write!(self.err, "\r\x1b[K{} {}/{}", glyph, installed, total)?;
        if installed >= total {
            writeln!(self.err)?;
        }
        self.err.flush()
    }

    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn progress(&mut self, installed: usize, total: usize) {
        if self.quiet {
            return;
        }
        // 端末が閉じていても停止処理は続ける
        let _ = self.draw_progress(installed, total);
    }

    fn trace(&mut self, line: &TraceLine) {
        let _ = writeln!(self.out, "{}", line).and_then(|()| self.out.flush());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter(quiet: bool) -> ConsoleReporter<Vec<u8>, Vec<u8>> {
        ConsoleReporter::with_writers(Vec::new(), Vec::new(), quiet)
    }

    #[test]
    fn test_trace_goes_to_stdout() {
        let mut reporter = reporter(false);
        reporter.trace(&TraceLine {
            location: "http://example.com/app.js".to_string(),
            line_number: 2,
            text: "b();".to_string(),
        });

        let (out, err) = reporter.into_writers();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[http://example.com/app.js:2] => b();\n"
        );
        assert!(err.is_empty());
    }

    #[test]
    fn test_spinner_advances_every_ten_steps() {
        let mut reporter = reporter(false);
        for installed in [1, 10, 20, 30, 40] {
            reporter.progress(installed, 50);
        }

        let (_, err) = reporter.into_writers();
        let err = String::from_utf8(err).unwrap();
        let frames: Vec<&str> = err.split("\r\x1b[K").filter(|s| !s.is_empty()).collect();
        assert_eq!(frames, vec!["/ 1/50", "- 10/50", "\\ 20/50", "| 30/50", "/ 40/50"]);
    }

    #[test]
    fn test_newline_after_final_step() {
        let mut reporter = reporter(false);
        reporter.progress(1, 2);
        reporter.progress(2, 2);

        let (_, err) = reporter.into_writers();
        let err = String::from_utf8(err).unwrap();
        assert!(err.ends_with("/ 2/2\n"));
        assert_eq!(err.matches('\n').count(), 1);
    }

    #[test]
    fn test_quiet_hides_progress() {
        let mut reporter = reporter(true);
        reporter.progress(1, 1);

        let (_, err) = reporter.into_writers();
        assert!(err.is_empty());
    }
}
