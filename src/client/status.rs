// Terminal rendering of an upload session

use std::io::{self, Write};

use crossterm::{
    cursor::MoveUp,
    queue,
    style::{Color, Print, Stylize},
    terminal::{Clear, ClearType},
};
use tracing::debug;

use super::session::{Phase, UploadSession};
use crate::types::UploadStatus;

const LIGHT_GREEN: Color = Color::Rgb { r: 116, g: 142, b: 129 };
const WHITE: Color = Color::Rgb { r: 233, g: 229, b: 227 };

pub const CHOOSE_PHOTO_MESSAGE: &str = "Wybierz zdjecia lub film";
pub const THANKS_MESSAGE: &str = "Dziekujemy!";
pub const THANKS_DETAIL: &str = "Wyslemy wam zdjecia po weselu!";

pub struct Icons;

impl Icons {
    pub const IDLE: &'static str = " ";
    pub const UPLOADING: &'static str = "⟳";
    pub const SUCCESS: &'static str = "✔";
    pub const FAILURE: &'static str = "✘";

    pub fn for_status(status: UploadStatus) -> &'static str {
        match status {
            UploadStatus::Idle => Self::IDLE,
            UploadStatus::Uploading => Self::UPLOADING,
            UploadStatus::Success => Self::SUCCESS,
            UploadStatus::Failure => Self::FAILURE,
        }
    }
}

/// Plain text lines for the current phase.
pub fn render_lines(session: &UploadSession) -> Vec<String> {
    match session.phase() {
        Phase::Picking => vec![CHOOSE_PHOTO_MESSAGE.to_string()],
        Phase::Uploading => session
            .statuses()
            .iter()
            .map(|track| format!("{} {}", Icons::for_status(track.status), track.name))
            .collect(),
        Phase::Thanks => vec![THANKS_MESSAGE.to_string(), THANKS_DETAIL.to_string()],
    }
}

/// Redraws the session in place, replacing what it drew last time.
#[derive(Default)]
pub struct StatusView {
    drawn_lines: u16,
}

impl StatusView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw<W: Write>(&mut self, out: &mut W, session: &UploadSession) -> io::Result<()> {
        if self.drawn_lines > 0 {
            queue!(out, MoveUp(self.drawn_lines), Clear(ClearType::FromCursorDown))?;
        }

        let lines = render_lines(session);
        match session.phase() {
            Phase::Uploading => {
                for track in session.statuses() {
                    queue!(
                        out,
                        Print(Icons::for_status(track.status).with(LIGHT_GREEN)),
                        Print(" "),
                        Print(track.name.as_str().with(WHITE)),
                        Print("\r\n")
                    )?;
                }
            }
            _ => {
                for line in &lines {
                    queue!(out, Print(line.as_str().with(WHITE)), Print("\r\n"))?;
                }
            }
        }
        out.flush()?;

        self.drawn_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        Ok(())
    }

    /// Draw from a progress callback. Terminal errors are logged, not raised.
    pub fn redraw<W: Write>(&mut self, out: &mut W, session: &UploadSession) -> bool {
        match self.draw(out, session) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Failed to draw upload status");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_phases() {
        let mut session = UploadSession::new();
        assert_eq!(render_lines(&session), vec![CHOOSE_PHOTO_MESSAGE]);

        session.begin(["a.jpg", "b.mp4"]);
        session.update_file_status(0, UploadStatus::Success);
        assert_eq!(render_lines(&session), vec!["✔ a.jpg", "⟳ b.mp4"]);

        session.update_file_status(1, UploadStatus::Failure);
        assert_eq!(render_lines(&session)[1], "✘ b.mp4");

        session.finish();
        assert_eq!(render_lines(&session), vec![THANKS_MESSAGE, THANKS_DETAIL]);
    }

    #[test]
    fn test_draw_rewinds_previous_output() {
        let mut session = UploadSession::new();
        session.begin(["a.jpg", "b.jpg"]);

        let mut view = StatusView::new();
        let mut first = Vec::new();
        view.draw(&mut first, &session).unwrap();
        let first = String::from_utf8(first).unwrap();
        assert!(first.contains("a.jpg"));
        assert!(!first.contains("\u{1b}[2A"));

        session.update_file_status(0, UploadStatus::Success);
        let mut second = Vec::new();
        view.draw(&mut second, &session).unwrap();
        let second = String::from_utf8(second).unwrap();
        // Cursor moves up over the two lines drawn before
        assert!(second.starts_with("\u{1b}[2A"));
        assert!(second.contains("✔"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_redraw_survives_broken_terminal() {
        let mut session = UploadSession::new();
        session.begin(["a.jpg"]);

        let mut view = StatusView::new();
        assert!(!view.redraw(&mut BrokenPipe, &session));

        // Nothing was drawn, so the next frame does not rewind
        let mut out = Vec::new();
        assert!(view.redraw(&mut out, &session));
        assert!(!String::from_utf8(out).unwrap().starts_with("\u{1b}[1A"));
    }
}
