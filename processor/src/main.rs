use std::time::Instant;

use anyhow::Result;
use indicatif::HumanDuration;

use processor::config::PipelineConfig;
use processor::demo_language_mapper::DemoLanguageMapper;
use processor::entry::{Entry, VecEntryStore};
use processor::run_pipeline;
use processor::wikitext::fixtures::MiniWikitextParser;

/// A thin binary wiring hardcoded test-double `EntryStore`/`LanguageMapper`/
/// `WikitextParser` implementations to the core pipeline (spec §2.1
/// Component M). CLI argument wiring is out of scope; this always runs the
/// same small demo corpus and reports the resulting relation count.
fn main() -> Result<()> {
    env_logger::init();
    let start = Instant::now();

    let entries = vec![
        Entry {
            title: "cat".to_owned(),
            namespace: String::new(),
            language: "en".to_owned(),
            sections: vec![vec!["Etymology".to_owned()]],
            texts: vec!["From {{inh|en|enm|cat}}, from {{inh|enm|ang|catt}}.".to_owned()],
            etym_count: 1,
            _i: 0,
        },
        Entry {
            title: "blackbird".to_owned(),
            namespace: String::new(),
            language: "en".to_owned(),
            sections: vec![vec!["Etymology".to_owned()]],
            texts: vec!["From ''[[black]]'' + ''[[bird]]''.".to_owned()],
            etym_count: 1,
            _i: 0,
        },
    ];
    let store = VecEntryStore::new(entries);
    let languages = DemoLanguageMapper;
    let parser = MiniWikitextParser;
    let config = PipelineConfig::new("data/xy-forms.txt");
    let xy_forms: Vec<String> = Vec::new();

    let graph = run_pipeline(&store, &languages, &parser, None, &config, &xy_forms);

    println!("Relations extracted: {}", graph.len());
    println!("Finished in {}.", HumanDuration(start.elapsed()));
    Ok(())
}
