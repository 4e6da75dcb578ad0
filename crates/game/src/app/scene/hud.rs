use std::time::Instant;

use engine::{line_advance, text_width, Canvas, Rgba};

use super::super::leaderboard::{BoardStatus, Medal, Scope};
use super::super::session::{format_elapsed, format_minutes_seconds, SessionState};
use super::{Connection, StillnessScene, Submission};

const BACKGROUND: Rgba = [14, 14, 20, 255];
const CHECK_BACKGROUND: Rgba = [70, 12, 16, 255];
const PANEL: Rgba = [28, 28, 38, 255];
const TEXT: Rgba = [235, 235, 240, 255];
const MUTED: Rgba = [130, 130, 150, 255];
const ACCENT: Rgba = [250, 204, 21, 255];
const DANGER: Rgba = [248, 113, 113, 255];
const SUCCESS: Rgba = [74, 222, 128, 255];
const GOLD: Rgba = [255, 215, 0, 255];
const SILVER: Rgba = [192, 192, 200, 255];
const BRONZE: Rgba = [205, 127, 50, 255];

const TITLE_SCALE: i32 = 4;
const TIMER_SCALE: i32 = 10;
const BODY_SCALE: i32 = 2;
const BOARD_ROW_SCALE: i32 = 2;
const MARGIN: i32 = 16;

impl StillnessScene {
    pub(super) fn draw(&self, canvas: &mut Canvas<'_>, now: Instant) {
        let challenge = self.session.open_challenge();
        canvas.clear(if challenge.is_some() {
            CHECK_BACKGROUND
        } else {
            BACKGROUND
        });

        let (width, height) = canvas.size();
        let (width, height) = (width as i32, height as i32);
        canvas.draw_text_centered(MARGIN * 2, "STAY STILL", TITLE_SCALE, TEXT);

        let elapsed = self
            .session
            .frame(now)
            .unwrap_or_else(|| self.session.elapsed(now));
        let timer_color = match self.session.state() {
            SessionState::Disqualified => DANGER,
            SessionState::Paused => MUTED,
            SessionState::Idle | SessionState::Active => TEXT,
        };
        let timer_y = height / 4;
        canvas.draw_text_centered(timer_y, &format_elapsed(elapsed), TIMER_SCALE, timer_color);

        let mut column = Column {
            y: timer_y + line_advance(TIMER_SCALE) + MARGIN,
        };
        match self.session.state() {
            SessionState::Idle => {
                column.line(canvas, "PRESS SPACE OR CLICK TO START", ACCENT);
                column.line(
                    canvas,
                    "NO MOUSE, NO KEYS, NO SCROLLING, NO OTHER WINDOWS",
                    MUTED,
                );
                column.line(
                    canvas,
                    &format!("BEST: {}", self.personal_best.display()),
                    TEXT,
                );
                column.line(
                    canvas,
                    &format!(
                        "REGION: {} {}",
                        self.region,
                        self.region.name().unwrap_or("UNKNOWN")
                    ),
                    MUTED,
                );
                column.line(canvas, "L: LEADERBOARD  F: WORLD/REGION  ESC: QUIT", MUTED);
            }
            SessionState::Active => match challenge {
                Some(challenge) => {
                    column.line(canvas, "SURVIVAL CHECK!", ACCENT);
                    column.line(canvas, "PRESS SPACE OR CLICK NOW", TEXT);
                    let countdown = challenge.remaining_seconds.to_string();
                    canvas.draw_text_centered(column.y, &countdown, TIMER_SCALE, ACCENT);
                }
                None => column.line(canvas, "DON'T MOVE...", MUTED),
            },
            SessionState::Paused => {
                column.line(canvas, "PAUSED", ACCENT);
                column.line(canvas, "SPACE: RESUME  ESC: MENU", MUTED);
            }
            SessionState::Disqualified => {
                if let Some(disqualification) = self.session.disqualification() {
                    column.line(canvas, disqualification.reason.message(), DANGER);
                }
                if let Some(attempt) = &self.last_attempt {
                    if attempt.new_best {
                        column.line(canvas, "NEW PERSONAL BEST!", SUCCESS);
                    }
                    column.line(canvas, &attempt.brag, MUTED);
                }
                column.line(
                    canvas,
                    &format!("NICKNAME: {}_", self.nickname_input),
                    TEXT,
                );
                match &self.submission {
                    Submission::Editing { error: None } => {
                        column.line(canvas, "ENTER: SUBMIT SCORE", ACCENT);
                    }
                    Submission::Editing { error: Some(error) } => {
                        column.line(canvas, error, DANGER);
                    }
                    Submission::Pending => column.line(canvas, "SUBMITTING...", MUTED),
                    Submission::Submitted(rank) => {
                        column.line(canvas, &format!("YOUR RANK: {rank}"), SUCCESS);
                        column.line(canvas, "ENTER: TRY AGAIN", ACCENT);
                    }
                    Submission::Failed(error) => {
                        column.line(canvas, &format!("SUBMIT FAILED: {error}"), DANGER);
                        column.line(canvas, "ENTER: RETRY", ACCENT);
                    }
                }
                column.line(canvas, "TAB: LEADERBOARD  ESC: MENU", MUTED);
            }
        }

        let (footer, footer_color) = match &self.connection {
            Connection::Connecting => ("CONNECTING TO LEADERBOARD...".to_string(), MUTED),
            Connection::Online(store) => (format!("LEADERBOARD: {store}"), MUTED),
            Connection::Offline(error) => (format!("LEADERBOARD OFFLINE: {error}"), DANGER),
        };
        canvas.draw_text(
            MARGIN,
            height - MARGIN - line_advance(1),
            &footer,
            1,
            footer_color,
        );

        if self.board_visible {
            self.draw_board(canvas, width, height);
        }
    }

    fn draw_board(&self, canvas: &mut Canvas<'_>, width: i32, height: i32) {
        let panel_width = (width / 2).max(text_width("00. NICKNAME00 00M 00S ZZ", BOARD_ROW_SCALE));
        let panel_x = width - panel_width - MARGIN;
        let panel_y = MARGIN;
        let panel_height = height - MARGIN * 2;
        canvas.fill_rect(panel_x, panel_y, panel_width, panel_height, PANEL);
        canvas.outline_rect(panel_x, panel_y, panel_width, panel_height, MUTED);

        let text_x = panel_x + MARGIN / 2;
        let mut y = panel_y + MARGIN / 2;
        let scope_label = match self.board.scope() {
            Scope::World => "WORLD".to_string(),
            Scope::Region(region) => region.to_string(),
        };
        canvas.draw_text(
            text_x,
            y,
            &format!("TOP {} {scope_label}", self.board.limit()),
            BOARD_ROW_SCALE,
            ACCENT,
        );
        y += line_advance(BOARD_ROW_SCALE);

        let my_duration = self
            .session
            .disqualification()
            .map(|disqualification| disqualification.elapsed.as_millis() as u64)
            .or(self.personal_best.best_ms());
        let stats = self.board.stats(my_duration);
        let standing = stats
            .top_percent
            .map_or_else(|| "-".to_string(), |percent| format!("TOP {percent}%"));
        canvas.draw_text(
            text_x,
            y,
            &format!(
                "PLAYERS {}  AVG {}  YOU {standing}",
                stats.participants,
                format_minutes_seconds(stats.average_ms)
            ),
            1,
            MUTED,
        );
        y += line_advance(1) + MARGIN / 2;

        match self.board.status() {
            BoardStatus::Idle | BoardStatus::Loading => {
                canvas.draw_text(text_x, y, "LOADING...", BOARD_ROW_SCALE, MUTED);
                return;
            }
            BoardStatus::Failed(error) => {
                canvas.draw_text(text_x, y, "COULD NOT LOAD:", BOARD_ROW_SCALE, DANGER);
                y += line_advance(BOARD_ROW_SCALE);
                canvas.draw_text(text_x, y, error, 1, DANGER);
                return;
            }
            BoardStatus::Ready if self.board.entries().is_empty() => {
                canvas.draw_text(text_x, y, "NO SCORES YET", BOARD_ROW_SCALE, MUTED);
                return;
            }
            BoardStatus::Ready => {}
        }

        let bottom = panel_y + panel_height - line_advance(BOARD_ROW_SCALE);
        for (rank, medal, record) in self.board.rows() {
            if y > bottom {
                break;
            }
            let color = match medal {
                Some(Medal::Gold) => GOLD,
                Some(Medal::Silver) => SILVER,
                Some(Medal::Bronze) => BRONZE,
                None => TEXT,
            };
            let row = format!(
                "{rank:>2}. {:<10} {:>7} {}",
                record.nickname,
                format_minutes_seconds(record.duration_ms),
                record.region
            );
            canvas.draw_text(text_x, y, &row, BOARD_ROW_SCALE, color);
            y += line_advance(BOARD_ROW_SCALE);
        }
    }
}

struct Column {
    y: i32,
}

impl Column {
    fn line(&mut self, canvas: &mut Canvas<'_>, text: &str, color: Rgba) {
        canvas.draw_text_centered(self.y, text, BODY_SCALE, color);
        self.y += line_advance(BODY_SCALE);
    }
}
