//! Feed paging arguments for search commands

use clap::Args;

use rentkit::properties::FeedCursor;

/// Paging through a search feed.
///
/// Snapshot feeds are addressed by page number, live feeds by the token
/// printed with the previous page.
#[derive(Args, Debug, Default, Clone)]
pub struct FeedArgs {
    /// Snapshot page to show (starts at 1)
    #[arg(long, short = 'p', conflicts_with = "next_token")]
    pub page: Option<u32>,

    /// Continue a live feed from this token
    #[arg(long)]
    pub next_token: Option<String>,

    /// Page size for live results
    #[arg(long, short = 'n')]
    pub limit: Option<u32>,
}

impl FeedArgs {
    pub fn cursor(&self) -> FeedCursor {
        match &self.next_token {
            Some(token) => FeedCursor::Live {
                next_token: Some(token.clone()),
            },
            None => FeedCursor::Snapshot {
                page: self.page.unwrap_or(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cursor_is_first_snapshot_page() {
        assert_eq!(FeedArgs::default().cursor(), FeedCursor::Snapshot { page: 1 });
    }

    #[test]
    fn test_token_selects_live_cursor() {
        let args = FeedArgs {
            next_token: Some("tok".to_string()),
            ..Default::default()
        };
        assert_eq!(
            args.cursor(),
            FeedCursor::Live {
                next_token: Some("tok".to_string())
            }
        );
    }
}
