//! Azure CLI analysis.

use super::{Invocation, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

const VALUE_OPTIONS: &[&str] = &[
    "-g",
    "--resource-group",
    "-n",
    "--name",
    "--subscription",
    "-o",
    "--output",
    "--query",
];

pub fn analyze_azure(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let args = invocation.args();
    let words = positionals(&args, VALUE_OPTIONS);

    match words.as_slice() {
        ["group", "delete", ..] => Verdict::deny(
            "az.group.delete",
            "az group delete destroys every resource in the resource group",
        ),
        ["keyvault", "purge", ..] => Verdict::deny(
            "az.keyvault.purge",
            "az keyvault purge permanently destroys a soft-deleted vault",
        ),
        ["storage", "account", "delete", ..] => Verdict::deny(
            "az.storage.account.delete",
            "az storage account delete destroys the account and all of its data",
        ),
        _ => match words.iter().position(|w| *w == "delete") {
            Some(at) => Verdict::warn(
                "az.delete",
                format!("az {} delete removes Azure resources", words[..at].join(" ")),
            ),
            None => Verdict::allow(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::rules::check;

    fn decide(cmd: &str) -> Decision {
        check(analyze_azure, cmd, &AnalyzerConfig::default()).decision
    }

    #[test]
    fn test_critical_deletes() {
        assert_eq!(decide("az group delete -n prod --yes"), Decision::Deny);
        assert_eq!(decide("az keyvault purge --name vault"), Decision::Deny);
        assert_eq!(decide("az storage account delete -n acct -g rg"), Decision::Deny);
    }

    #[test]
    fn test_other_deletes_warn() {
        assert_eq!(decide("az vm delete -g rg -n vm1"), Decision::Warn);
        assert_eq!(decide("az webapp delete --name app"), Decision::Warn);
    }

    #[test]
    fn test_read_only_allowed() {
        assert_eq!(decide("az vm list -g rg"), Decision::Allow);
        assert_eq!(decide("az account show"), Decision::Allow);
    }
}
