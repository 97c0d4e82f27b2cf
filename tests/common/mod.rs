use std::path::Path;
use std::sync::Arc;

use beanbot_core::config::{TemplateConfig, TemplateDocument};
use beanbot_core::dispatch::{DispatchChain, TemplateDispatcher};
use beanbot_core::grammar::{BeanGrammar, Grammar};
use beanbot_core::service::EntryService;
use beanbot_core::store::LedgerStore;

/// Template document shared by the integration suites, mirroring a typical
/// user configuration.
pub const FIXTURE_DOCUMENT: &str = r#"{
    "config": {
        "default_account": "Assets:Digital:Alipay",
        "accounts": {
            "zfb": "Assets:Digital:Alipay",
            "wx": "Assets:Digital:Wechat"
        }
    },
    "templates": [
        {
            "command": "vultr",
            "template": "{date} * \"Vultr\" \"月费\"\n  {account}\n  Expenses:Tech:Cloud  5 USD"
        },
        {
            "command": ["饮料", "饮"],
            "args": ["value"],
            "template": "{date} * \"{command}\"\n  {account}\n  Expenses:Food:Drink  {value} CNY"
        },
        {
            "command": "trip",
            "args": ["cost"],
            "optional_args": ["note"],
            "computed": {"total": "cost * 2", "memo": "'trip:' + note"},
            "template": "{date} * \"Trip\" \"{memo}\"\n  {account}\n  Expenses:Travel  {total} CNY"
        },
        {
            "command": "note",
            "args": ["text"],
            "template": "; note {text}"
        }
    ]
}"#;

pub fn fixture_config() -> Arc<TemplateConfig> {
    let document: TemplateDocument =
        serde_json::from_str(FIXTURE_DOCUMENT).expect("parse fixture document");
    Arc::new(TemplateConfig::from_document(document).expect("validate fixture document"))
}

pub fn shared_grammar() -> Arc<dyn Grammar> {
    Arc::new(BeanGrammar::new())
}

pub fn store_at(path: &Path) -> LedgerStore {
    LedgerStore::new(path.to_string_lossy().to_string(), shared_grammar())
}

pub fn service_at(path: &Path) -> EntryService {
    let grammar = shared_grammar();
    let dispatcher = TemplateDispatcher::new(fixture_config(), Arc::clone(&grammar));
    let chain = DispatchChain::new(vec![Box::new(dispatcher)]);
    EntryService::new(chain, store_at(path))
}
