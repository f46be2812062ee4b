use crate::infra::{build_store, parse_report_type};
use clap::Args;
use forms_report::config::AppConfig;
use forms_report::error::AppError;
use forms_report::reports::forms::{
    FormListPage, FormsQuery, FormsReportService, InMemorySubmissionStore, ReportRequest,
};
use forms_report::reports::{ReportError, ReportRegistry, ReportType};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct DataArgs {
    /// JSON file with submission records. Defaults to the demo data set.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

/// Filter, sort and paging flags; parsed exactly like the HTTP query string.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct FilterArgs {
    /// Case-insensitive substring of company name or code
    #[arg(long)]
    company: Option<String>,
    /// LISTED, STATE_OWNED, MUNICIPALITY_OWNED or OTHER
    #[arg(long)]
    company_type: Option<String>,
    /// Earliest submission date (YYYY-MM-DD)
    #[arg(long)]
    submitted_from: Option<String>,
    /// Latest submission date (YYYY-MM-DD)
    #[arg(long)]
    submitted_to: Option<String>,
    /// Reporting period start (YYYY-MM-DD)
    #[arg(long)]
    report_from: Option<String>,
    /// Reporting period end (YYYY-MM-DD)
    #[arg(long)]
    report_to: Option<String>,
    /// outside_33_67
    #[arg(long)]
    gender_imbalance: Option<String>,
    /// meets_33 or not_meet_33
    #[arg(long)]
    gender_alignment: Option<String>,
    /// yes or no
    #[arg(long)]
    requirements_applied: Option<String>,
    /// Sort key, e.g. companyName or submissionDate
    #[arg(long)]
    sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    sort_dir: Option<String>,
}

impl FilterArgs {
    fn query(&self) -> FormsQuery {
        FormsQuery {
            company: self.company.clone(),
            company_type: self.company_type.clone(),
            submission_date_from: self.submitted_from.clone(),
            submission_date_to: self.submitted_to.clone(),
            report_from: self.report_from.clone(),
            report_to: self.report_to.clone(),
            gender_imbalance: self.gender_imbalance.clone(),
            gender_alignment: self.gender_alignment.clone(),
            requirements_applied: self.requirements_applied.clone(),
            sort_by: self.sort_by.clone(),
            sort_dir: self.sort_dir.clone(),
            ..FormsQuery::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FormsListArgs {
    #[command(flatten)]
    pub(crate) data: DataArgs,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// 1-based page number
    #[arg(long)]
    pub(crate) page: Option<String>,
    /// One of 10, 25, 50, 100
    #[arg(long)]
    pub(crate) page_size: Option<String>,
    /// Print the page as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReportArgs {
    /// Report type: companies-list or forms-list
    #[arg(value_parser = parse_report_type)]
    pub(crate) report: ReportType,
    #[command(flatten)]
    pub(crate) data: DataArgs,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Restrict output to these column keys
    #[arg(long, value_delimiter = ',')]
    pub(crate) columns: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) report: ReportArgs,
    /// Use the extended export column set
    #[arg(long)]
    pub(crate) full: bool,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

fn service_for(data: &DataArgs) -> Result<FormsReportService<InMemorySubmissionStore>, AppError> {
    let config = AppConfig::load()?;
    let store = build_store(
        data.seed.as_deref(),
        config.environment.allows_demo_data(),
    )?;
    Ok(FormsReportService::new(
        Arc::new(store),
        Arc::new(ReportRegistry::standard()),
        config.reports,
    ))
}

pub(crate) fn run_forms_list(args: FormsListArgs) -> Result<(), AppError> {
    let service = service_for(&args.data)?;
    let query = FormsQuery {
        page: args.page,
        page_size: args.page_size,
        ..args.filters.query()
    };
    let parsed = query.parse().map_err(ReportError::from)?;
    let page = service.list_forms(&parsed.filters, &parsed.sort, parsed.page)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page).map_err(ReportError::from)?);
    } else {
        render_page(&page);
    }
    Ok(())
}

fn render_page(page: &FormListPage) {
    println!(
        "Submitted forms: page {} ({} per page), {} matching",
        page.page, page.page_size, page.total
    );
    if page.items.is_empty() {
        println!("  (no submissions)");
        return;
    }
    for item in &page.items {
        println!(
            "  {:<10} {:<28} {:<18} {}  women {:>3}%  men {:>3}%",
            item.id.as_str(),
            item.company_name,
            item.company_type.code(),
            item.submitted_at,
            item.women_percent,
            item.men_percent
        );
    }
}

pub(crate) fn run_report_preview(args: ReportArgs) -> Result<(), AppError> {
    let service = service_for(&args.data)?;
    let parsed = args.filters.query().parse().map_err(ReportError::from)?;
    let request = ReportRequest::new(args.report, &parsed.filters)
        .with_sort(parsed.sort)
        .with_allowed(args.columns.as_deref());
    let preview = service.preview_report(request)?;
    println!("{}", serde_json::to_string_pretty(&preview).map_err(ReportError::from)?);
    Ok(())
}

pub(crate) fn run_report_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs { report, full, out } = args;
    let service = service_for(&report.data)?;
    let parsed = report.filters.query().parse().map_err(ReportError::from)?;
    let request = ReportRequest::new(report.report, &parsed.filters)
        .with_sort(parsed.sort)
        .with_allowed(report.columns.as_deref());
    let file = service.export_report(request, full)?;

    match out {
        Some(path) => {
            std::fs::write(&path, &file.bytes)?;
            eprintln!(
                "Wrote {} rows ({} bytes) to {}",
                file.rows,
                file.bytes.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&file.bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
