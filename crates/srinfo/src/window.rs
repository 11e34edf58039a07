//! Rolling window of relevant programming around "now".

use chrono::{DateTime, Duration, NaiveDate, Utc};
use srinfo_proto::config::WindowConfig;
use srinfo_proto::Episode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub behind: Duration,
    pub ahead: Duration,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            behind: Duration::hours(6),
            ahead: Duration::hours(12),
        }
    }
}

impl From<&WindowConfig> for TimeWindow {
    fn from(config: &WindowConfig) -> Self {
        Self {
            behind: Duration::hours(config.look_behind_hours.into()),
            ahead: Duration::hours(config.look_ahead_hours.into()),
        }
    }
}

impl TimeWindow {
    /// Keep the episodes starting strictly inside `(now - behind, now + ahead)`.
    /// Input order is preserved.
    pub fn trim(&self, episodes: Vec<Episode>, now: DateTime<Utc>) -> Vec<Episode> {
        let earliest = now - self.behind;
        let latest = now + self.ahead;
        episodes
            .into_iter()
            .filter(|e| e.start() > earliest && e.start() < latest)
            .collect()
    }

    /// UTC calendar dates touched by the window, oldest first. With the
    /// default 6h/12h window this is today plus at most one neighbour.
    pub fn dates(&self, now: DateTime<Utc>) -> Vec<NaiveDate> {
        let first = (now - self.behind).date_naive();
        let last = (now + self.ahead).date_naive();
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn episode_at(start: DateTime<Utc>) -> Episode {
        Episode::new("ep", start, start + Duration::minutes(30)).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_trim_bounds_are_exclusive() {
        let now = noon();
        let window = TimeWindow::default();
        let episodes = vec![
            episode_at(now - Duration::hours(6)),
            episode_at(now - Duration::hours(6) + Duration::seconds(1)),
            episode_at(now),
            episode_at(now + Duration::hours(12) - Duration::seconds(1)),
            episode_at(now + Duration::hours(12)),
        ];
        let kept = window.trim(episodes, now);
        let starts: Vec<_> = kept.iter().map(|e| e.start()).collect();
        assert_eq!(
            starts,
            vec![
                now - Duration::hours(6) + Duration::seconds(1),
                now,
                now + Duration::hours(12) - Duration::seconds(1),
            ]
        );
    }

    #[test]
    fn test_trim_drops_far_future_episode() {
        let now = noon();
        let kept = TimeWindow::default().trim(vec![episode_at(now + Duration::hours(20))], now);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_trim_keeps_input_order() {
        let now = noon();
        let later = episode_at(now + Duration::hours(2));
        let earlier = episode_at(now - Duration::hours(2));
        let kept = TimeWindow::default().trim(vec![later.clone(), earlier.clone()], now);
        assert_eq!(kept, vec![later, earlier]);
    }

    #[test]
    fn test_every_kept_episode_is_inside_window() {
        let now = noon();
        let window = TimeWindow::default();
        let episodes: Vec<_> = (-30..30)
            .map(|h| episode_at(now + Duration::minutes(h * 45)))
            .collect();
        for e in window.trim(episodes, now) {
            assert!(now - Duration::hours(6) < e.start());
            assert!(e.start() < now + Duration::hours(12));
        }
    }

    #[test]
    fn test_dates_midday_is_single_day() {
        let dates = TimeWindow::default().dates(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()]);
    }

    #[test]
    fn test_dates_early_morning_includes_yesterday() {
        let dates = TimeWindow::default().dates(Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap());
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_dates_evening_includes_tomorrow() {
        let dates = TimeWindow::default().dates(Utc.with_ymd_and_hms(2024, 12, 31, 18, 0, 0).unwrap());
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_window_from_config() {
        let config = WindowConfig {
            look_behind_hours: 1,
            look_ahead_hours: 48,
        };
        let window = TimeWindow::from(&config);
        assert_eq!(window.behind, Duration::hours(1));
        let dates = window.dates(noon());
        assert_eq!(dates.len(), 3);
    }
}
