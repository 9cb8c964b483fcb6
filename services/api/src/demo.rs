use crate::infra::{build_service, parse_answer_pair, InMemoryProfileRepository};
use chrono::{Duration, Local};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use sustain_ai::coaching::{
    AnswerSet, CategoryId, DetailValue, DisabledProvider, Goal, Profile, RecommendationSet,
    ServiceNotice, SurveyImporter, SustainabilityCoachService, UserId,
};
use sustain_ai::config::{AppConfig, CoachingConfig};
use sustain_ai::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Identifier for the profile being assessed
    #[arg(long)]
    pub(crate) user: String,
    /// CSV export with `question,answer` rows
    #[arg(long)]
    pub(crate) answers_csv: Option<PathBuf>,
    /// Individual answer as QUESTION=ANSWER; overrides CSV rows (repeatable)
    #[arg(long = "answer", value_parser = parse_answer_pair)]
    pub(crate) answers: Vec<(String, DetailValue)>,
    /// Print a narrative summary after the scores
    #[arg(long)]
    pub(crate) summarize: bool,
    /// Emit the stored profile as JSON instead of the text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Identifier used for the scripted profile
    #[arg(long, default_value = "demo-user")]
    pub(crate) user: String,
}

pub(crate) async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        user,
        answers_csv,
        answers,
        summarize,
        json,
    } = args;

    let mut survey = match answers_csv {
        Some(path) => SurveyImporter::from_path(path)?,
        None => AnswerSet::new(),
    };
    survey.extend(answers);

    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let user_id = UserId(user);

    let snapshot = service.create_profile(user_id.clone(), survey).await?;
    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to serialize profile: {err}"),
        }
    } else {
        render_profile(&snapshot.profile);
        render_notices(&snapshot.notices);
    }

    if summarize {
        let summary = service.summarize(&user_id).await?;
        println!("\nSummary\n{summary}");
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = SustainabilityCoachService::new(
        Arc::new(InMemoryProfileRepository::default()),
        Arc::new(DisabledProvider::knowledge_source()),
        Arc::new(DisabledProvider::generative_backend()),
        CoachingConfig::default(),
    );
    let user_id = UserId(args.user);

    println!("Sustainability coaching demo (offline providers)");
    let snapshot = service
        .create_profile(user_id.clone(), sample_survey())
        .await?;
    render_profile(&snapshot.profile);

    println!("\nUpdating energy usage after switching to a green tariff");
    let mut energy = AnswerSet::new();
    energy.insert("renewable_energy".to_string(), DetailValue::Flag(true));
    energy.insert("led_lighting".to_string(), DetailValue::from("most"));
    let update = service
        .update_category(&user_id, CategoryId::EnergyUsage.key(), energy)
        .await?;
    println!(
        "- {} now {}/100 | overall {}/100",
        update.category.label(),
        update.state.score,
        update.overall_score
    );

    let goal = service
        .add_goal(
            &user_id,
            CategoryId::Transportation.key(),
            "Take the train for weekly commutes".to_string(),
            Some(Local::now().date_naive() + Duration::days(30)),
        )
        .await?;
    let goal = service
        .record_progress(&user_id, &goal.id, 40, Some("Two of five trips".to_string()))
        .await?;
    println!();
    render_goal(&goal);

    let set = service
        .recommendations(&user_id, CategoryId::Transportation.key())
        .await?;
    println!("\nTransportation recommendations");
    render_recommendations(&set);

    let summary = service.summarize(&user_id).await?;
    println!("\nSummary\n{summary}");

    Ok(())
}

fn sample_survey() -> AnswerSet {
    [
        ("transport_primary_mode", DetailValue::from("car")),
        ("commute_distance", DetailValue::Number(18.0)),
        ("flights_per_year", DetailValue::Number(1.0)),
        ("renewable_energy", DetailValue::Flag(false)),
        ("thermostat_setting", DetailValue::Number(22.0)),
        ("shower_duration", DetailValue::Number(6.0)),
        ("low_flow_fixtures", DetailValue::Flag(true)),
        ("composting", DetailValue::Flag(true)),
        ("meat_frequency", DetailValue::from("weekly")),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

fn render_profile(profile: &Profile) {
    println!(
        "Profile {} | overall score {}/100",
        profile.user_id,
        profile.overall_score()
    );
    if profile.categories.is_empty() {
        println!("- no categories assessed");
    }
    for (category, state) in &profile.categories {
        println!(
            "- {}: {}/100 ({} answers)",
            category.label(),
            state.score,
            state.detailed_data.len()
        );
        for recommendation in &state.recommendations {
            println!(
                "    * {} [{:?} effort, {:?} impact]",
                recommendation.title, recommendation.difficulty, recommendation.impact
            );
        }
    }
}

fn render_recommendations(set: &RecommendationSet) {
    for recommendation in &set.recommendations {
        println!(
            "- {}: {} ({:?})",
            recommendation.title, recommendation.description, recommendation.source
        );
    }
    render_notices(&set.notices);
}

fn render_goal(goal: &Goal) {
    println!(
        "Goal {} [{}]: {} | {}% ({})",
        goal.id,
        goal.category.label(),
        goal.description,
        goal.progress,
        goal.status.label()
    );
    if let Some(target) = goal.target_date {
        println!("  target {}", target.format("%Y-%m-%d"));
    }
}

fn render_notices(notices: &[ServiceNotice]) {
    if notices.is_empty() {
        return;
    }
    let labels: Vec<&str> = notices.iter().map(|notice| notice.as_str()).collect();
    println!("(degraded: {})", labels.join(", "));
}
