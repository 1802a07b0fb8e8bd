use pipesh::{dispatch, parser};
use proptest::prelude::*;

proptest! {
	#[test]
	fn validated_pipelines_never_hold_empty_commands(line in "[a-c |;&<>\n]{0,40}") {
		let Ok(parsed) = parser::parse(line.as_bytes()) else { return Ok(()) };
		let parsed_count = parsed.pipelines.len();
		if let Ok(pipelines) = dispatch::validate(parsed) {
			prop_assert!(pipelines.len() <= parsed_count);
			for pipeline in &pipelines {
				prop_assert!(!pipeline.commands.is_empty());
				for command in &pipeline.commands {
					prop_assert!(!command.argv.is_empty());
					prop_assert!(command.argv.iter().all(|a| !a.is_empty()));
				}
			}
		}
	}

	#[test]
	fn blank_separators_validate_to_nothing(line in "[ ;\t]{0,20}") {
		let parsed = parser::parse(line.as_bytes()).unwrap();
		prop_assert!(dispatch::validate(parsed).unwrap().is_empty());
	}
}
