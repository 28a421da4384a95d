use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use symptom_flow::{
    Answer, ArtifactLoader, FeaturePipeline, FlowError, PatientIdentity, ResultView,
    SessionState, Submission, presenter, render_session,
};
use symptom_service::{config::DEFAULT_ARTIFACT_DIR, telemetry::init_cli_tracing};

/// Predict a disease from symptoms given on the command line.
#[derive(Debug, Parser)]
#[command(name = "diagnose", version)]
struct Args {
    /// Directory holding model.json, class_names.json and feature_names.json
    #[arg(long, env = "ARTIFACT_DIR", default_value = DEFAULT_ARTIFACT_DIR)]
    artifact_dir: PathBuf,

    /// Symptom the patient has (feature name); repeat for several
    #[arg(short, long = "symptom")]
    symptoms: Vec<String>,

    #[arg(long)]
    patient_name: Option<String>,

    #[arg(long)]
    patient_age: Option<u16>,

    /// Refuse to predict without patient name and age
    #[arg(long, env = "REQUIRE_PATIENT_IDENTITY")]
    require_identity: bool,

    /// Print the symptom names the model knows and exit
    #[arg(long)]
    list_symptoms: bool,
}

fn print_view(view: &ResultView) {
    match view {
        ResultView::Empty { title, message } => {
            println!("## {title}");
            println!("{message}");
        }
        ResultView::Ready {
            title,
            patient_header,
            presentation,
        } => {
            println!("## {title}");
            println!("{patient_header}");
            println!("[{:?}] {}", presentation.style, presentation.headline);
            println!();
            println!("{}", presentation.subheading);
            println!("{}", presentation.description);
            println!("---");
            println!("{}", presentation.disclaimer);
        }
    }
}

fn run(args: Args) -> Result<ExitCode, FlowError> {
    let artifacts = ArtifactLoader::from_dir(&args.artifact_dir).load()?;
    let pipeline = FeaturePipeline::new(artifacts, args.require_identity);

    if args.list_symptoms {
        for column in pipeline.form().columns {
            for field in column {
                println!("{:<28} {}", field.feature, field.label);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let patient = PatientIdentity::new(args.patient_name.unwrap_or_default(), args.patient_age);
    println!("{}", presenter::form_prompt(&patient.name));

    let submission = Submission {
        selections: args
            .symptoms
            .into_iter()
            .map(|s| (s, Answer::Yes))
            .collect(),
        patient,
    };

    match pipeline.submit(&submission) {
        Ok(diagnosis) => {
            let mut state = SessionState::new();
            state.set_for_patient(diagnosis.disease_name, &submission.patient);
            print_view(&render_session(&state));
            Ok(ExitCode::SUCCESS)
        }
        Err(FlowError::Validation(e)) => {
            eprintln!("Peringatan: {e}");
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e),
    }
}

fn main() -> ExitCode {
    init_cli_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "diagnose failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
