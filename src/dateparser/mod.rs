mod oracle;

pub use oracle::{HttpTemporalOracle, OracleReply, TemporalOracle};

use std::sync::Arc;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::validation::sanitize_for_oracle;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Unparseable {
    /// The phrase does not describe a future point in time (or the oracle
    /// replied with something unusable).
    #[error("the phrase does not describe a future point in time")]
    NoTemporalMeaning,
    /// The oracle could not be reached; worth retrying later.
    #[error("the date parsing service is unavailable")]
    OracleUnavailable,
}

/// Turns a free-text phrase into an absolute instant by resolving it against
/// a reference instant interpreted in a reference timezone.
pub struct TemporalNormalizer {
    oracle: Arc<dyn TemporalOracle>,
}

impl TemporalNormalizer {
    pub fn new(oracle: Arc<dyn TemporalOracle>) -> Self {
        Self { oracle }
    }

    pub async fn normalize(
        &self,
        phrase: &str,
        reference_instant: DateTime<Utc>,
        reference_timezone: Tz,
    ) -> Result<DateTime<Utc>, Unparseable> {
        let phrase = sanitize_for_oracle(phrase);
        if phrase.is_empty() {
            return Err(Unparseable::NoTemporalMeaning);
        }

        let now_local = reference_instant.with_timezone(&reference_timezone);
        let reply = match self.oracle.interpret(&phrase, now_local).await {
            Ok(reply) => reply,
            Err(error) => {
                log::warn!("Oracle call failed. [error = {error:#}]");
                return Err(Unparseable::OracleUnavailable);
            }
        };

        if !reply.valid {
            return Err(Unparseable::NoTemporalMeaning);
        }

        let Some(raw) = reply.local_datetime else {
            log::warn!("Oracle claimed validity without a timestamp. [phrase = {phrase:?}]");
            return Err(Unparseable::NoTemporalMeaning);
        };

        let Some(local) = parse_local_timestamp(&raw, reference_timezone) else {
            log::warn!("Oracle returned a malformed timestamp. [raw = {raw:?}]");
            return Err(Unparseable::NoTemporalMeaning);
        };

        let instant = local.with_timezone(&Utc);
        if instant <= reference_instant {
            return Err(Unparseable::NoTemporalMeaning);
        }

        Ok(instant)
    }
}

/// Accepts an offset-carrying ISO-8601 timestamp (converted into the
/// reference zone) or a naive one (interpreted in the reference zone, taking
/// the earliest reading when the zone makes the wall-clock time ambiguous).
fn parse_local_timestamp(raw: &str, zone: Tz) -> Option<DateTime<Tz>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&zone));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()?;

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Some(local),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono_tz::Asia::Singapore;
    use proptest::prelude::*;
    use test_strategy::proptest;

    struct ScriptedOracle {
        reply: Option<OracleReply>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn replying(reply: OracleReply) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TemporalOracle for ScriptedOracle {
        async fn interpret(
            &self,
            phrase: &str,
            _now_local: DateTime<Tz>,
        ) -> anyhow::Result<OracleReply> {
            self.calls.lock().unwrap().push(phrase.to_string());
            self.reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("oracle is down"))
        }
    }

    fn reference() -> DateTime<Utc> {
        // 2024-01-01T10:00:00 in Singapore.
        Singapore
            .with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn normalizer(oracle: &Arc<ScriptedOracle>) -> TemporalNormalizer {
        TemporalNormalizer::new(Arc::clone(oracle) as Arc<dyn TemporalOracle>)
    }

    #[tokio::test]
    async fn empty_phrase_is_rejected_without_an_oracle_call() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some("2024-01-01T12:00:00+08:00".to_string()),
            valid: true,
        });

        let result = normalizer(&oracle)
            .normalize("   \n ", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::NoTemporalMeaning));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn relative_phrase_resolves_against_the_reference_zone() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some("2024-01-01T12:00:00+08:00".to_string()),
            valid: true,
        });

        let instant = normalizer(&oracle)
            .normalize("in 2 hours", reference(), Singapore)
            .await
            .unwrap();

        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap()
        );
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn naive_timestamp_is_interpreted_in_the_reference_zone() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some("2024-01-01T12:00:00".to_string()),
            valid: true,
        });

        let instant = normalizer(&oracle)
            .normalize("noon", reference(), Singapore)
            .await
            .unwrap();

        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn oracle_failure_maps_to_unavailable() {
        let oracle = ScriptedOracle::failing();

        let result = normalizer(&oracle)
            .normalize("tomorrow", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::OracleUnavailable));
    }

    #[tokio::test]
    async fn invalid_reply_is_no_temporal_meaning() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: None,
            valid: false,
        });

        let result = normalizer(&oracle)
            .normalize("gibberish", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::NoTemporalMeaning));
    }

    #[tokio::test]
    async fn validity_without_a_timestamp_is_rejected() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: None,
            valid: true,
        });

        let result = normalizer(&oracle)
            .normalize("tomorrow", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::NoTemporalMeaning));
    }

    #[tokio::test]
    async fn malformed_timestamp_is_rejected() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some("not-a-date".to_string()),
            valid: true,
        });

        let result = normalizer(&oracle)
            .normalize("tomorrow", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::NoTemporalMeaning));
    }

    #[tokio::test]
    async fn past_timestamp_is_rejected() {
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some("2023-12-31T23:00:00+08:00".to_string()),
            valid: true,
        });

        let result = normalizer(&oracle)
            .normalize("yesterday evening", reference(), Singapore)
            .await;

        assert_eq!(result, Err(Unparseable::NoTemporalMeaning));
    }

    fn tokio_ct(
        future: impl std::future::Future<Output = Result<(), TestCaseError>>,
    ) -> Result<(), TestCaseError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[proptest(async = tokio_ct)]
    async fn normalized_instant_round_trips_to_the_reference_zone(
        #[strategy(1i64..525_600)] minutes_ahead: i64,
    ) {
        let expected_local =
            (reference() + chrono::Duration::minutes(minutes_ahead)).with_timezone(&Singapore);
        let oracle = ScriptedOracle::replying(OracleReply {
            local_datetime: Some(expected_local.to_rfc3339()),
            valid: true,
        });

        let instant = normalizer(&oracle)
            .normalize("soon", reference(), Singapore)
            .await
            .unwrap();

        prop_assert_eq!(instant.with_timezone(&Singapore), expected_local);
        prop_assert!(instant > reference());
    }
}
