use lr1_studio::{analyze, AnalyzeError};
use serde_json::Value;

const ARITHMETIC: &str = "\
E -> E + T | T
T -> T * F | F
F -> ( E ) | id
";

fn bundle(grammar: &str, input: &str) -> Value {
    let analysis = analyze(grammar, input).unwrap();
    serde_json::to_value(&analysis).unwrap()
}

#[test]
fn arithmetic_bundle_shape() {
    let doc = bundle(ARITHMETIC, "id + id * id");

    let grammar = &doc["grammar"];
    assert_eq!(grammar["start_symbol"], "E'");
    assert_eq!(
        grammar["non_terminals"],
        serde_json::json!(["E", "E'", "F", "T"])
    );
    assert_eq!(
        grammar["terminals"],
        serde_json::json!(["$", "(", ")", "*", "+", "id"])
    );
    assert_eq!(grammar["productions"]["E"], serde_json::json!(["E + T", "T"]));
    assert_eq!(grammar["productions"]["E'"], serde_json::json!(["E"]));
    assert_eq!(grammar["first"]["E"], serde_json::json!(["(", "id"]));

    // dfa ids are a contiguous prefix of the naturals
    let dfa = doc["dfa"].as_array().unwrap();
    for (i, state) in dfa.iter().enumerate() {
        assert_eq!(state["id"].as_u64().unwrap(), i as u64);
    }

    // every item carries the four artifact fields
    let item = &dfa[0]["items"][0];
    assert!(item["head"].is_string());
    assert!(item["body"].is_array());
    assert!(item["dot_pos"].is_u64());
    assert!(item["search_symbol"].is_string());

    let result = &doc["parse_result"];
    assert_eq!(result["accepted"], true);
    assert!(result.get("error").is_none());

    let steps = result["steps"].as_array().unwrap();
    assert_eq!(steps.last().unwrap()["action"], "acc");
    // E -> E + T is rule 1 under sorted-head numbering
    assert_eq!(steps[steps.len() - 2]["action"], "r1");
}

#[test]
fn action_and_goto_cells_are_well_formed() {
    let doc = bundle(ARITHMETIC, "id");
    let n_states = doc["dfa"].as_array().unwrap().len() as u64;
    let n_rules = doc["parsing_table"]["rules"].as_array().unwrap().len();

    let action = doc["parsing_table"]["action"].as_object().unwrap();
    assert_eq!(action.len() as u64, n_states);
    let mut accepts = 0;
    for row in action.values() {
        for (terminal, cell) in row.as_object().unwrap() {
            assert_ne!(terminal, "ε");
            let cell = cell.as_str().unwrap();
            match cell.split_at(cell.len().min(1)) {
                ("", _) => {}
                ("s", id) => assert!(id.parse::<u64>().unwrap() < n_states),
                ("r", num) => assert!(num.parse::<usize>().unwrap() < n_rules),
                ("a", "cc") => accepts += 1,
                _ => panic!("malformed cell {cell:?}"),
            }
        }
    }
    assert_eq!(accepts, 1);

    let goto = doc["parsing_table"]["goto"].as_object().unwrap();
    assert_eq!(goto.len() as u64, n_states);
    for row in goto.values() {
        for (nonterminal, cell) in row.as_object().unwrap() {
            assert_ne!(nonterminal, "E'");
            match cell {
                Value::Number(id) => assert!(id.as_u64().unwrap() < n_states),
                Value::String(s) => assert_eq!(s, ""),
                other => panic!("malformed goto cell {other:?}"),
            }
        }
    }

    // rule 0 is the augmented-start production
    let rules = doc["parsing_table"]["rules"].as_array().unwrap();
    assert_eq!(rules[0]["num"], 0);
    assert_eq!(rules[0]["head"], "E'");
    assert_eq!(rules[0]["body"], serde_json::json!(["E"]));
}

#[test]
fn reanalysis_is_byte_identical() {
    let a = serde_json::to_string(&analyze(ARITHMETIC, "id + id").unwrap()).unwrap();
    let b = serde_json::to_string(&analyze(ARITHMETIC, "id + id").unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn balanced_parens_accept_and_reject() {
    let grammar = "S -> ( S ) | ''";

    let doc = bundle(grammar, "( ( ) )");
    assert_eq!(doc["parse_result"]["accepted"], true);
    // the ε-production surfaces in the artifact vocabulary
    assert!(doc["grammar"]["terminals"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("ε")));
    assert!(doc["grammar"]["first"]["S"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("ε")));
    assert_eq!(doc["grammar"]["productions"]["S"], serde_json::json!(["( S )", "ε"]));

    let doc = bundle(grammar, "( (");
    let result = &doc["parse_result"];
    assert_eq!(result["accepted"], false);
    let error = result["error"].as_str().unwrap();
    assert!(error.contains("`$`"), "unexpected error: {error}");
    // the trace is preserved and ends at the failing configuration
    let steps = result["steps"].as_array().unwrap();
    assert_eq!(steps.last().unwrap()["action"], "");
}

#[test]
fn empty_input_on_nullable_start() {
    let doc = bundle("S -> ''", "");
    let result = &doc["parse_result"];
    assert_eq!(result["accepted"], true);
    let steps = result["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1]["action"], "acc");
    assert_eq!(steps[0]["stack"], serde_json::json!([0]));
    assert_eq!(steps[0]["input"], serde_json::json!(["$"]));
}

#[test]
fn comma_list_scenarios() {
    let grammar = "L -> L , id | id";
    let doc = bundle(grammar, "id,id,id");
    assert_eq!(doc["parse_result"]["accepted"], true);

    let doc = bundle(grammar, "id id");
    assert_eq!(doc["parse_result"]["accepted"], false);
    assert!(doc["parse_result"]["error"]
        .as_str()
        .unwrap()
        .contains("`id`"));
}

#[test]
fn mixed_stack_entries_in_trace() {
    let doc = bundle(ARITHMETIC, "id");
    let steps = doc["parse_result"]["steps"].as_array().unwrap();
    let last_stack = steps.last().unwrap()["stack"].as_array().unwrap();
    // state ids interleave with symbol names, a state at both ends
    assert!(last_stack[0].is_u64());
    assert!(last_stack[1].is_string());
    assert!(last_stack[2].is_u64());
}

#[test]
fn lalr_only_grammar_builds() {
    // canonical LR(1) keeps lookahead-distinct states apart; LALR would
    // merge them into a reduce/reduce conflict
    let doc = bundle("S -> A a | b A c | d c | b d a\nA -> d", "b d c");
    assert_eq!(doc["parse_result"]["accepted"], true);
}

#[test]
fn dangling_else_reports_shift_reduce() {
    let err = analyze("S -> i S e S | i S | a", "i a e a").unwrap_err();
    match err {
        AnalyzeError::Conflict(inner) => {
            let message = inner.to_string();
            assert!(message.contains("shift/reduce"), "unexpected: {message}");
            assert!(message.contains("`e`"), "unexpected: {message}");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[test]
fn malformed_grammar_is_fatal() {
    assert!(matches!(analyze("", "x"), Err(AnalyzeError::Grammar(..))));
    assert!(matches!(
        analyze("-> a b", "x"),
        Err(AnalyzeError::Grammar(..))
    ));
}
