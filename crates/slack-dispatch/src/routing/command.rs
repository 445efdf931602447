use std::sync::Arc;

use regex::Regex;

use super::RoutingTable;
use crate::traits::MentionHandler;

/// A compiled mention pattern and its handler.
pub struct CommandBinding {
    pub(super) pattern: String,
    pub(super) regex: Regex,
    pub(super) handler: Arc<dyn MentionHandler>,
}

impl CommandBinding {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// The binding selected for a mention and the captures it produced.
pub struct CommandMatch<'a> {
    pub pattern: &'a str,
    pub handler: &'a Arc<dyn MentionHandler>,
    /// Index 0 is the whole match; groups that did not participate are empty.
    pub captures: Vec<String>,
}

impl RoutingTable {
    /// Select the handler for a mention's text.
    ///
    /// Patterns are tried in registration order against the trimmed text and
    /// the first match wins. `None` means no pattern matched.
    pub fn route_mention(&self, text: &str) -> Option<CommandMatch<'_>> {
        let text = text.trim();
        self.commands.iter().find_map(|binding| {
            binding.regex.captures(text).map(|caps| CommandMatch {
                pattern: &binding.pattern,
                handler: &binding.handler,
                captures: caps
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::CallLog;
    use super::*;

    const BUILD: &str = r"<@.+> build (\S+)( clean)?";
    const PING: &str = r"<@.+> ping(.*)";
    const INSTALL: &str = r"<@.+> install (\S+) (\S+)";

    fn table(log: &CallLog) -> RoutingTable {
        RoutingTable::builder()
            .mention(BUILD, log.handler("build"))
            .mention(PING, log.handler("ping"))
            .mention(INSTALL, log.handler("install"))
            .build()
            .unwrap()
    }

    #[test]
    fn single_match_yields_submatch_list() {
        let log = CallLog::default();
        let table = table(&log);

        let m = table.route_mention("<@UBOT> install ios 42").unwrap();
        assert_eq!(m.pattern, INSTALL);
        assert_eq!(m.captures, ["<@UBOT> install ios 42", "ios", "42"]);
    }

    #[test]
    fn non_participating_group_is_empty_string() {
        let log = CallLog::default();
        let table = table(&log);

        let m = table.route_mention("<@UBOT> build android").unwrap();
        assert_eq!(m.pattern, BUILD);
        assert_eq!(m.captures, ["<@UBOT> build android", "android", ""]);

        let m = table.route_mention("<@UBOT> build android clean").unwrap();
        assert_eq!(m.captures[2], " clean");
    }

    #[test]
    fn text_is_trimmed_before_matching() {
        let log = CallLog::default();
        let table = RoutingTable::builder()
            .mention(r"^<@\w+> ping$", log.handler("ping"))
            .build()
            .unwrap();

        let m = table.route_mention("  <@UBOT> ping \n").unwrap();
        assert_eq!(m.captures, ["<@UBOT> ping"]);
    }

    #[test]
    fn no_match_reports_none() {
        let log = CallLog::default();
        let table = table(&log);

        assert!(table.route_mention("<@UBOT> deploy prod").is_none());
        assert!(table.route_mention("").is_none());
    }

    #[test]
    fn earliest_registration_wins_on_overlap() {
        const ANY_VERB: &str = r"<@.+> (\w+)";
        let log = CallLog::default();
        // Both patterns match "<@UBOT> ping x".
        let table = RoutingTable::builder()
            .mention(PING, log.handler("ping"))
            .mention(ANY_VERB, log.handler("any"))
            .build()
            .unwrap();
        let m = table.route_mention("<@UBOT> ping x").unwrap();
        assert_eq!(m.pattern, PING);
        assert_eq!(m.captures, ["<@UBOT> ping x", " x"]);

        let reversed = RoutingTable::builder()
            .mention(ANY_VERB, log.handler("any"))
            .mention(PING, log.handler("ping"))
            .build()
            .unwrap();
        let m = reversed.route_mention("<@UBOT> ping x").unwrap();
        assert_eq!(m.pattern, ANY_VERB);
        assert_eq!(m.captures, ["<@UBOT> ping", "ping"]);
    }

    #[test]
    fn tie_break_is_stable_across_calls() {
        let log = CallLog::default();
        let table = RoutingTable::builder()
            .mention("deploy", log.handler("first"))
            .mention("deploy (\\w+)", log.handler("second"))
            .mention(".*", log.handler("catch-all"))
            .build()
            .unwrap();
        for _ in 0..50 {
            assert_eq!(table.route_mention("deploy web").unwrap().pattern, "deploy");
        }
    }

    #[tokio::test]
    async fn matched_handler_receives_captures() {
        let log = CallLog::default();
        let table = table(&log);
        let event = crate::types::MentionEvent {
            user: "U1".to_string(),
            channel: "C1".to_string(),
            text: "<@UBOT> ping hello".to_string(),
            ts: "1.0".to_string(),
            thread_ts: None,
        };

        let m = table.route_mention(event.trimmed_text()).unwrap();
        m.handler.handle(&event, &m.captures).await.unwrap();

        assert_eq!(
            log.calls(),
            vec![(
                "ping".to_string(),
                vec!["<@UBOT> ping hello".to_string(), " hello".to_string()]
            )]
        );
    }
}
