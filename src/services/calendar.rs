// src/services/calendar.rs
//! Interview scheduling against Google Calendar, plus the business-hours slot search

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc, Weekday};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::core::config_manager::CalendarConfig;
use crate::types::ScheduledMeeting;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";
const CALENDAR_SCOPE: &str =
    "https://www.googleapis.com/auth/calendar https://www.googleapis.com/auth/calendar.events";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar is not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid service account key: {0}")]
    InvalidKey(String),
    #[error("Failed to sign service account token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Calendar request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Calendar API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected calendar response: {0}")]
    InvalidResponse(String),
}

// ===== Scheduling model =====

#[derive(Debug, Clone)]
pub struct MeetingDetails {
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_title: String,
    pub company_name: String,
    pub duration_minutes: u32,
    /// Fixed start; when absent the next free business-hours slot is used
    pub time_slot: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Working hours in a fixed offset from UTC
#[derive(Debug, Clone, Copy)]
pub struct BusinessHours {
    pub utc_offset_minutes: i32,
    pub start_hour: u32,
    pub end_hour: u32,
    pub search_days: i64,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            start_hour: 9,
            end_hour: 17,
            search_days: 7,
        }
    }
}

impl BusinessHours {
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self {
            utc_offset_minutes: config.utc_offset_minutes,
            start_hour: config.business_start_hour,
            end_hour: config.business_end_hour,
            search_days: config.search_days,
        }
    }

    fn offset(&self) -> Duration {
        Duration::minutes(self.utc_offset_minutes as i64)
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc() + self.offset()
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(local - self.offset(), Utc)
    }

    fn is_open(&self, local: NaiveDateTime) -> bool {
        let weekday = local.weekday();
        let hour = local.hour();
        !matches!(weekday, Weekday::Sat | Weekday::Sun)
            && hour >= self.start_hour
            && hour < self.end_hour
    }
}

/// First weekday business-hours slot, on the hour, that overlaps no busy interval.
/// Starts at the next full local hour and searches `search_days` ahead.
pub fn find_next_available_slot(
    now: DateTime<Utc>,
    busy: &[BusyInterval],
    duration_minutes: u32,
    hours: &BusinessHours,
) -> DateTime<Utc> {
    let limit = now + Duration::days(hours.search_days);
    let duration = Duration::minutes(duration_minutes as i64);

    let local_now = hours.to_local(now);
    let mut candidate = local_now
        .date()
        .and_hms_opt(local_now.hour(), 0, 0)
        .unwrap_or(local_now)
        + Duration::hours(1);

    while hours.to_utc(candidate) < limit {
        if hours.is_open(candidate) {
            let start = hours.to_utc(candidate);
            let end = start + duration;
            let conflict = busy
                .iter()
                .any(|event| start < event.end && end > event.start);
            if !conflict {
                return start;
            }
        }
        candidate += Duration::hours(1);
    }

    fallback_slot(now, hours)
}

/// Tomorrow at 10:00 local time
pub fn fallback_slot(now: DateTime<Utc>, hours: &BusinessHours) -> DateTime<Utc> {
    let tomorrow = hours.to_local(now).date() + Duration::days(1);
    let ten = tomorrow
        .and_hms_opt(10, 0, 0)
        .unwrap_or_else(|| tomorrow.and_time(Default::default()));
    hours.to_utc(ten)
}

#[async_trait]
pub trait InterviewScheduler: Send + Sync {
    async fn schedule_interview(
        &self,
        details: &MeetingDetails,
    ) -> Result<ScheduledMeeting, CalendarError>;

    async fn cancel_interview(&self, event_id: &str) -> Result<(), CalendarError>;

    async fn reschedule_interview(
        &self,
        event_id: &str,
        new_time: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<ScheduledMeeting, CalendarError>;
}

// ===== Google Calendar =====

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct GoogleCalendar {
    client: reqwest::Client,
    key: ServiceAccountKey,
    calendar_id: String,
    time_zone: String,
    hours: BusinessHours,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendar {
    pub fn new(
        key: ServiceAccountKey,
        calendar_id: String,
        time_zone: String,
        hours: BusinessHours,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            key,
            calendar_id,
            time_zone,
            hours,
            token: Mutex::new(None),
        })
    }

    /// Load the service account key file named in the configuration.
    /// A calendar id of `primary` resolves to the HR mailbox.
    pub fn from_config(config: &CalendarConfig, hr_email: &str) -> Result<Self, CalendarError> {
        let key_file = config.service_account_key_file.as_deref().ok_or_else(|| {
            CalendarError::NotConfigured("GOOGLE_SERVICE_ACCOUNT_KEY_FILE is not set".to_string())
        })?;

        Self::new(
            load_service_account_key(key_file)?,
            resolve_calendar_id(&config.calendar_id, hr_email),
            config.time_zone.clone(),
            BusinessHours::from_config(config),
        )
    }

    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.value.clone());
            }
        }

        let token_uri = self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now();
        let claims = TokenClaims {
            iss: &self.key.client_email,
            scope: CALENDAR_SCOPE,
            aud: token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(token.access_token)
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url, CalendarError> {
        let mut url =
            Url::parse(CALENDAR_API).map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CalendarError::InvalidResponse("calendar API URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn busy_intervals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let token = self.access_token().await?;
        let mut url = self.events_url(None)?;
        url.query_pairs_mut()
            .append_pair("timeMin", &from.to_rfc3339())
            .append_pair("timeMax", &to.to_rfc3339())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let body: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        Ok(parse_busy_intervals(&body))
    }

    async fn next_free_slot(&self, duration_minutes: u32) -> DateTime<Utc> {
        let now = Utc::now();
        let until = now + Duration::days(self.hours.search_days);
        match self.busy_intervals(now, until).await {
            Ok(busy) => find_next_available_slot(now, &busy, duration_minutes, &self.hours),
            Err(e) => {
                error!("Error finding available slot: {}", e);
                fallback_slot(now, &self.hours)
            }
        }
    }

    fn event_time(&self, instant: DateTime<Utc>) -> Value {
        json!({ "dateTime": instant.to_rfc3339(), "timeZone": self.time_zone })
    }

    /// `start`/`end` pair, also the whole patch body of a reschedule
    fn time_window(&self, start: DateTime<Utc>, duration_minutes: u32) -> Value {
        let end = start + Duration::minutes(duration_minutes as i64);
        json!({
            "start": self.event_time(start),
            "end": self.event_time(end),
        })
    }

    fn event_body(&self, details: &MeetingDetails, start: DateTime<Utc>) -> Value {
        let mut body = json!({
            "summary": event_summary(details),
            "description": event_description(details),
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "email", "minutes": 24 * 60 },
                    { "method": "email", "minutes": 60 },
                    { "method": "popup", "minutes": 15 }
                ]
            },
            "visibility": "public"
        });
        let window = self.time_window(start, details.duration_minutes);
        body["start"] = window["start"].clone();
        body["end"] = window["end"].clone();
        body
    }
}

#[async_trait]
impl InterviewScheduler for GoogleCalendar {
    async fn schedule_interview(
        &self,
        details: &MeetingDetails,
    ) -> Result<ScheduledMeeting, CalendarError> {
        let start = match details.time_slot {
            Some(slot) => slot,
            None => self.next_free_slot(details.duration_minutes).await,
        };

        info!(
            "Scheduling interview for {} at {}",
            details.candidate_name,
            start.to_rfc3339()
        );

        let body = self.event_body(details, start);

        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.events_url(None)?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let event: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        let meeting = meeting_from_event(&event, start, details.duration_minutes)?;
        info!("Interview scheduled: event {}", meeting.event_id);
        Ok(meeting)
    }

    async fn cancel_interview(&self, event_id: &str) -> Result<(), CalendarError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(token)
            .send()
            .await?;
        check_status(response).await?;

        info!("Interview {} cancelled", event_id);
        Ok(())
    }

    async fn reschedule_interview(
        &self,
        event_id: &str,
        new_time: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<ScheduledMeeting, CalendarError> {
        let body = self.time_window(new_time, duration_minutes);

        let token = self.access_token().await?;
        let response = self
            .client
            .patch(self.events_url(Some(event_id))?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let event: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;

        info!("Interview {} rescheduled to {}", event_id, new_time.to_rfc3339());
        meeting_from_event(&event, new_time, duration_minutes)
    }
}

// ===== Helpers =====

pub fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey, CalendarError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CalendarError::InvalidKey(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| CalendarError::InvalidKey(format!("{}: {}", path.display(), e)))
}

pub fn resolve_calendar_id(configured: &str, hr_email: &str) -> String {
    if configured == "primary" {
        hr_email.to_string()
    } else {
        configured.to_string()
    }
}

pub fn event_summary(details: &MeetingDetails) -> String {
    format!(
        "Interview: {} - {} for {}",
        details.candidate_name, details.job_title, details.company_name
    )
}

fn event_description(details: &MeetingDetails) -> String {
    format!(
        "🤖 AI-Scheduled Interview\n\n\
         Candidate: {}\n\
         Email: {}\n\
         Position: {}\n\
         Company: {}\n\n\
         This interview was automatically scheduled based on AI analysis showing this candidate as a strong fit.\n\n\
         Please review the candidate's analysis before the meeting.",
        details.candidate_name, details.candidate_email, details.job_title, details.company_name
    )
}

/// Timed events only; all-day events carry no `dateTime` and are ignored
fn parse_busy_intervals(body: &Value) -> Vec<BusyInterval> {
    let parse = |v: &Value| {
        v["dateTime"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };

    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(BusyInterval {
                        start: parse(&item["start"])?,
                        end: parse(&item["end"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn meeting_from_event(
    event: &Value,
    start: DateTime<Utc>,
    duration_minutes: u32,
) -> Result<ScheduledMeeting, CalendarError> {
    let event_id = event["id"]
        .as_str()
        .ok_or_else(|| CalendarError::InvalidResponse("event has no id".to_string()))?;

    Ok(ScheduledMeeting {
        event_id: event_id.to_string(),
        scheduled_time: start,
        duration_minutes,
        calendar_link: event["htmlLink"].as_str().unwrap_or_default().to_string(),
    })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Calendar API error {}: {}", status, body);
    Err(CalendarError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Stands in when no service account is configured: every call fails, so
/// hire decisions fall back to the HR summary.
pub struct UnavailableCalendar {
    reason: String,
}

impl UnavailableCalendar {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InterviewScheduler for UnavailableCalendar {
    async fn schedule_interview(
        &self,
        _details: &MeetingDetails,
    ) -> Result<ScheduledMeeting, CalendarError> {
        Err(CalendarError::NotConfigured(self.reason.clone()))
    }

    async fn cancel_interview(&self, _event_id: &str) -> Result<(), CalendarError> {
        Err(CalendarError::NotConfigured(self.reason.clone()))
    }

    async fn reschedule_interview(
        &self,
        _event_id: &str,
        _new_time: DateTime<Utc>,
        _duration_minutes: u32,
    ) -> Result<ScheduledMeeting, CalendarError> {
        Err(CalendarError::NotConfigured(self.reason.clone()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Records scheduling requests; optionally fails every call
    #[derive(Default)]
    pub struct RecordingScheduler {
        pub fail: bool,
        pub scheduled: StdMutex<Vec<MeetingDetails>>,
        pub cancelled: StdMutex<Vec<String>>,
    }

    impl RecordingScheduler {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl InterviewScheduler for RecordingScheduler {
        async fn schedule_interview(
            &self,
            details: &MeetingDetails,
        ) -> Result<ScheduledMeeting, CalendarError> {
            if self.fail {
                return Err(CalendarError::NotConfigured("test".to_string()));
            }
            self.scheduled.lock().unwrap().push(details.clone());
            Ok(ScheduledMeeting {
                event_id: "evt-1".to_string(),
                scheduled_time: details.time_slot.unwrap_or_else(Utc::now),
                duration_minutes: details.duration_minutes,
                calendar_link: "https://calendar.example/evt-1".to_string(),
            })
        }

        async fn cancel_interview(&self, event_id: &str) -> Result<(), CalendarError> {
            self.cancelled.lock().unwrap().push(event_id.to_string());
            Ok(())
        }

        async fn reschedule_interview(
            &self,
            event_id: &str,
            new_time: DateTime<Utc>,
            duration_minutes: u32,
        ) -> Result<ScheduledMeeting, CalendarError> {
            Ok(ScheduledMeeting {
                event_id: event_id.to_string(),
                scheduled_time: new_time,
                duration_minutes,
                calendar_link: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_next_full_hour_inside_business_hours() {
        // Tuesday 2024-03-05 10:20 UTC
        let slot = find_next_available_slot(
            utc(2024, 3, 5, 10, 20),
            &[],
            30,
            &BusinessHours::default(),
        );
        assert_eq!(slot, utc(2024, 3, 5, 11, 0));
    }

    #[test]
    fn test_skips_conflicts_and_evenings() {
        let busy = [
            BusyInterval {
                start: utc(2024, 3, 5, 15, 15),
                end: utc(2024, 3, 5, 16, 15),
            },
            BusyInterval {
                start: utc(2024, 3, 6, 9, 0),
                end: utc(2024, 3, 6, 10, 0),
            },
        ];
        // 15:00 overlaps the first event, 16:00 too; evening is closed; Wed 09:00 is busy
        let slot = find_next_available_slot(
            utc(2024, 3, 5, 14, 5),
            &busy,
            30,
            &BusinessHours::default(),
        );
        assert_eq!(slot, utc(2024, 3, 6, 10, 0));
    }

    #[test]
    fn test_weekend_rolls_to_monday_in_local_time() {
        let hours = BusinessHours {
            utc_offset_minutes: 60,
            ..BusinessHours::default()
        };
        // Saturday 2024-03-09 12:00 UTC, first slot is Monday 09:00 local (08:00 UTC)
        let slot = find_next_available_slot(utc(2024, 3, 9, 12, 0), &[], 30, &hours);
        assert_eq!(slot, utc(2024, 3, 11, 8, 0));
    }

    #[test]
    fn test_fully_booked_week_falls_back_to_tomorrow_ten() {
        let now = utc(2024, 3, 5, 10, 0);
        let busy = [BusyInterval {
            start: now,
            end: now + Duration::days(8),
        }];
        let slot = find_next_available_slot(now, &busy, 30, &BusinessHours::default());
        assert_eq!(slot, utc(2024, 3, 6, 10, 0));
    }

    #[test]
    fn test_resolve_calendar_id_and_summary() {
        assert_eq!(resolve_calendar_id("primary", "hr@acme.test"), "hr@acme.test");
        assert_eq!(resolve_calendar_id("team@group", "hr@acme.test"), "team@group");

        let details = MeetingDetails {
            candidate_name: "Jane".to_string(),
            candidate_email: "jane@example.com".to_string(),
            job_title: "Rust Engineer".to_string(),
            company_name: "Acme".to_string(),
            duration_minutes: 30,
            time_slot: None,
        };
        assert_eq!(
            event_summary(&details),
            "Interview: Jane - Rust Engineer for Acme"
        );
        assert!(event_description(&details).contains("Email: jane@example.com"));
    }

    #[test]
    fn test_parse_busy_intervals_ignores_all_day_events() {
        let body = json!({
            "items": [
                { "start": { "dateTime": "2024-03-05T10:00:00+01:00" }, "end": { "dateTime": "2024-03-05T11:00:00+01:00" } },
                { "start": { "date": "2024-03-06" }, "end": { "date": "2024-03-07" } }
            ]
        });
        let busy = parse_busy_intervals(&body);
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].start, utc(2024, 3, 5, 9, 0));
    }

    #[test]
    fn test_meeting_from_event_keeps_actual_start() {
        let start = utc(2024, 3, 5, 11, 0);
        let meeting = meeting_from_event(
            &json!({ "id": "abc", "htmlLink": "https://calendar.google.com/abc" }),
            start,
            30,
        )
        .unwrap();
        assert_eq!(meeting.scheduled_time, start);
        assert_eq!(meeting.duration_minutes, 30);
        assert!(meeting_from_event(&json!({}), start, 30).is_err());
    }

    fn calendar() -> GoogleCalendar {
        let key = ServiceAccountKey {
            client_email: "svc@acme.iam.gserviceaccount.com".to_string(),
            private_key: String::new(),
            token_uri: None,
        };
        GoogleCalendar::new(
            key,
            "hr@acme.test".to_string(),
            "Europe/Paris".to_string(),
            BusinessHours::default(),
        )
        .unwrap()
    }

    fn details(time_slot: Option<DateTime<Utc>>) -> MeetingDetails {
        MeetingDetails {
            candidate_name: "Jane".to_string(),
            candidate_email: "jane@example.com".to_string(),
            job_title: "Rust Engineer".to_string(),
            company_name: "Acme".to_string(),
            duration_minutes: 45,
            time_slot,
        }
    }

    #[test]
    fn test_event_body_has_reminders_and_local_zone() {
        let start = utc(2024, 3, 5, 11, 0);
        let body = calendar().event_body(&details(Some(start)), start);

        assert_eq!(body["summary"], "Interview: Jane - Rust Engineer for Acme");
        assert_eq!(body["visibility"], "public");
        assert_eq!(body["start"]["dateTime"], "2024-03-05T11:00:00+00:00");
        assert_eq!(body["end"]["dateTime"], "2024-03-05T11:45:00+00:00");
        assert_eq!(body["end"]["timeZone"], "Europe/Paris");
        assert_eq!(body["reminders"]["useDefault"], false);
        assert_eq!(
            body["reminders"]["overrides"],
            json!([
                { "method": "email", "minutes": 1440 },
                { "method": "email", "minutes": 60 },
                { "method": "popup", "minutes": 15 }
            ])
        );
    }

    #[test]
    fn test_reschedule_body_only_moves_the_window() {
        let body = calendar().time_window(utc(2024, 3, 6, 14, 0), 30);
        assert_eq!(body.as_object().unwrap().len(), 2);
        assert_eq!(body["start"]["dateTime"], "2024-03-06T14:00:00+00:00");
        assert_eq!(body["end"]["dateTime"], "2024-03-06T14:30:00+00:00");
    }

    #[test]
    fn test_events_url_targets_one_event_for_cancel() {
        let calendar = calendar();
        assert_eq!(
            calendar.events_url(None).unwrap().as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/hr@acme.test/events"
        );
        assert_eq!(
            calendar.events_url(Some("evt/1")).unwrap().as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/hr@acme.test/events/evt%2F1"
        );
    }
}
