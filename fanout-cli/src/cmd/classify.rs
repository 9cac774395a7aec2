use fanout_core::classify;
use serde::Serialize;

use crate::exit_codes;
use crate::output::print_result;
use crate::OutputArgs;

#[derive(Debug, Serialize)]
struct ClassifyResult<'a> {
    code: &'a str,
    message: Option<&'a str>,
    category: &'static str,
    severity: &'static str,
    transient: bool,
}

pub async fn classify_cmd(code: &str, message: Option<&str>, output: OutputArgs) -> i32 {
    let c = classify(code, message.unwrap_or(""));
    print_result(
        output.format,
        output.quiet,
        &ClassifyResult {
            code,
            message,
            category: c.category.as_str(),
            severity: c.severity.as_str(),
            transient: c.is_transient(),
        },
    );
    exit_codes::SUCCESS
}
