use fanout_core::{build_tasks, Account};
use serde::Serialize;

use crate::cmd::config::{parse_account, read_json_or_yaml};
use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{MatrixArgs, OutputArgs};

#[derive(Debug, Serialize)]
struct PlanResult {
    accounts: usize,
    regions: usize,
    tasks: Vec<PlannedTask>,
}

#[derive(Debug, Serialize)]
struct PlannedTask {
    index: usize,
    account_id: String,
    account_name: String,
    region: String,
}

pub async fn plan_cmd(matrix: MatrixArgs, output: OutputArgs) -> i32 {
    let (accounts, regions) = match resolve_matrix(&matrix) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };

    let tasks = build_tasks(&accounts, &regions)
        .into_iter()
        .map(|t| PlannedTask {
            index: t.index,
            account_id: t.account.id,
            account_name: t.account.name,
            region: t.region,
        })
        .collect();

    print_result(
        output.format,
        output.quiet,
        &PlanResult {
            accounts: accounts.len(),
            regions: regions.len(),
            tasks,
        },
    );
    exit_codes::SUCCESS
}

/// Accounts from `--accounts-file` then `--account`, deduplicated by id in first-seen order.
pub fn resolve_matrix(matrix: &MatrixArgs) -> Result<(Vec<Account>, Vec<String>), String> {
    let mut accounts: Vec<Account> = match &matrix.accounts_file {
        Some(path) => read_json_or_yaml(path)?,
        None => Vec::new(),
    };
    for s in &matrix.accounts {
        accounts.push(parse_account(s)?);
    }
    let mut seen = std::collections::HashSet::new();
    accounts.retain(|a| seen.insert(a.id.clone()));

    let mut regions: Vec<String> = Vec::new();
    for r in &matrix.regions {
        let r = r.trim();
        if !r.is_empty() && !regions.iter().any(|x| x == r) {
            regions.push(r.to_string());
        }
    }

    if accounts.is_empty() {
        return Err("no accounts given (use --account or --accounts-file)".to_string());
    }
    if regions.is_empty() {
        return Err("no regions given (use --region)".to_string());
    }
    Ok((accounts, regions))
}
