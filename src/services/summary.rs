// src/services/summary.rs
//! Plain-text HR summaries sent after the pipeline has decided

use chrono::{DateTime, Duration, Utc};

use crate::types::{ProcessingResult, ScheduledMeeting};
use crate::utils::{bullet_list, comma_list};

/// Summary for applications that need a human decision
pub fn hr_summary(candidate_name: &str, candidate_email: &str, result: &ProcessingResult) -> String {
    let mut out = header(candidate_name, candidate_email);
    out.push_str(&analysis_sections(result));
    out.push_str("\nStatus: Complete AI analysis with recommendation ready for manual review.\n");
    out
}

/// Summary for candidates whose interview was booked automatically
pub fn hr_summary_with_meeting(
    candidate_name: &str,
    candidate_email: &str,
    result: &ProcessingResult,
    meeting: &ScheduledMeeting,
    utc_offset_minutes: i32,
) -> String {
    let mut out = header(candidate_name, candidate_email);
    out.push_str("🎯 ⭐ STRONG CANDIDATE - INTERVIEW AUTO-SCHEDULED ⭐\n\n");
    out.push_str(&format!(
        "📅 SCHEDULED INTERVIEW:\n\
         • Date & Time: {}\n\
         • Duration: {} minutes\n\
         • Calendar Event: {}\n\
         • Event ID: {}\n\n",
        format_local(meeting.scheduled_time, utc_offset_minutes),
        meeting.duration_minutes,
        meeting.calendar_link,
        meeting.event_id
    ));
    out.push_str(&analysis_sections(result));
    out.push_str(
        "\n🤖 AI ACTIONS TAKEN:\n\
         • ✅ Complete analysis performed\n\
         • ✅ Interview automatically scheduled\n\
         • ✅ Calendar invites sent to candidate\n\
         • ✅ Reminders set (1 day, 1 hour, 15 minutes before)\n\n\
         Status: Ready for interview - no further action needed unless you want to reschedule.\n",
    );
    out
}

/// `Tuesday, March 5, 2024 at 12:00` in the given offset
pub fn format_local(instant: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    (instant.naive_utc() + Duration::minutes(utc_offset_minutes as i64))
        .format("%A, %B %-d, %Y at %H:%M")
        .to_string()
}

fn header(candidate_name: &str, candidate_email: &str) -> String {
    format!(
        "🤖 HR AGENT ANALYSIS FOR {}\nEmail: {}\n\n",
        candidate_name.to_uppercase(),
        candidate_email
    )
}

fn analysis_sections(result: &ProcessingResult) -> String {
    let candidate = &result.candidate_data;
    let analysis = &result.analysis_result;
    let decision = &result.decision_result;

    format!(
        "📊 CANDIDATE PROFILE:\n\
         • Experience: {} years\n\
         • Skills: {}\n\
         • Education: {}\n\
         • Previous roles: {}\n\n\
         📈 ANALYSIS SCORES:\n\
         • Technical Skills: {}/10\n\
         • Experience Level: {}/10\n\
         • Education Fit: {}/10\n\
         • Overall Fit: {}/10\n\n\
         ✅ STRENGTHS:\n{}\n\n\
         ⚠️ CONCERNS:\n{}\n\n\
         🎯 FINAL RECOMMENDATION: {}\n\
         Confidence: {}/10\n\n\
         📝 REASONING:\n{}\n\n\
         📋 NEXT STEPS:\n{}\n",
        candidate.years_of_experience,
        comma_list(&candidate.technical_skills, "None specified"),
        candidate.education_level,
        comma_list(&candidate.previous_roles, "None specified"),
        analysis.technical_skills_score,
        analysis.experience_score,
        analysis.education_score,
        analysis.overall_fit,
        bullet_list(&analysis.strengths, "None identified"),
        bullet_list(&analysis.concerns, "None identified"),
        decision.recommendation,
        decision.confidence,
        bullet_list(&decision.reasoning, "None provided"),
        bullet_list(&decision.next_steps, "None provided"),
    )
}
