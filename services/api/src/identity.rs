use chrono::NaiveDate;
use clap::Args;
use docforge::error::AppError;
use docforge::workflows::licence::identity::random_date_of_birth;
use docforge::workflows::licence::{ApplicantRecord, DocumentFields};

#[derive(Args, Debug)]
pub(crate) struct DeriveArgs {
    /// Applicant first name
    #[arg(long)]
    pub(crate) first_name: String,
    /// Applicant last name
    #[arg(long)]
    pub(crate) last_name: String,
    /// Date of birth (YYYY-MM-DD). A synthetic date is generated when omitted.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date_of_birth: Option<NaiveDate>,
    /// First address line
    #[arg(long, default_value = "")]
    pub(crate) address1: String,
    /// Second address line
    #[arg(long, default_value = "")]
    pub(crate) address2: String,
}

pub(crate) fn run_identity_derive(args: DeriveArgs) -> Result<(), AppError> {
    let fields = derive_fields(args)?;
    for line in render_fields(&fields) {
        println!("{line}");
    }
    Ok(())
}

fn derive_fields(args: DeriveArgs) -> Result<DocumentFields, AppError> {
    let mut rng = rand::thread_rng();
    let date_of_birth = args
        .date_of_birth
        .unwrap_or_else(|| random_date_of_birth(&mut rng));
    let record = ApplicantRecord::new(
        args.first_name,
        args.last_name,
        args.address1,
        args.address2,
        date_of_birth,
    )?;
    Ok(DocumentFields::derive(&record, &mut rng))
}

fn render_fields(fields: &DocumentFields) -> Vec<String> {
    let mut lines = vec![
        format!("Identifier:    {}", fields.identifier),
        format!("Name:          {} {}", fields.first_name, fields.last_name),
        format!("Date of birth: {}", fields.date_of_birth),
    ];
    if !fields.address1.is_empty() || !fields.address2.is_empty() {
        lines.push(format!(
            "Address:       {} {}",
            fields.address1, fields.address2
        ));
    }
    lines
}
