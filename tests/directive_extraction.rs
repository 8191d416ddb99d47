use kestrel_copilot::directive::{Directive, DirectiveExtractor, FileEditDirective, SceneEditDirective};

const REPLY: &str = "Sure, here is a controller for the player.

```csharp:Assets/Scripts/PlayerController.cs
using UnityEngine;

public class PlayerController : MonoBehaviour { }
```

Then make the player heavier so it does not float away:

scene:Player/Rigidbody/mass=10

Let me know if anything else is needed.";

fn extractor() -> DirectiveExtractor {
    DirectiveExtractor::new(&["csharp", "cs"]).expect("directive patterns")
}

#[test]
fn interleaved_prose_yields_one_of_each_in_order() {
    let found: Vec<Directive> =
        extractor().extract(REPLY).into_iter().collect::<Result<_, _>>().expect("all directives parse");
    assert_eq!(found.len(), 2);
    match &found[0] {
        Directive::FileEdit(FileEditDirective { path, content }) => {
            assert_eq!(path, "Assets/Scripts/PlayerController.cs");
            assert!(content.starts_with("using UnityEngine;"));
            assert!(content.ends_with("MonoBehaviour { }"));
        }
        other => panic!("expected a file edit first, got {other:?}"),
    }
    assert_eq!(
        found[1],
        Directive::SceneEdit(SceneEditDirective::SetProperty {
            object_path: "Player".into(),
            component_name: "Rigidbody".into(),
            property_name: "mass".into(),
            raw_value: "10".into(),
        })
    );
}

#[test]
fn extraction_is_idempotent() {
    let extractor = extractor();
    assert_eq!(extractor.extract(REPLY), extractor.extract(REPLY));
}

#[test]
fn scene_lines_keep_source_order_around_file_blocks() {
    let text = "scene:Create/Enemy/Rigidbody\n\n```cs:Assets/Enemy.cs\nclass Enemy {}\n```\n```scene:Enemy/Rigidbody/useGravity=false```";
    let kinds: Vec<&str> = extractor()
        .extract(text)
        .iter()
        .map(|d| match d {
            Ok(Directive::FileEdit(_)) => "file",
            Ok(Directive::SceneEdit(SceneEditDirective::CreateEntity { .. })) => "create",
            Ok(Directive::SceneEdit(SceneEditDirective::SetProperty { .. })) => "set",
            Err(_) => "error",
        })
        .collect();
    assert_eq!(kinds, vec!["create", "file", "set"]);
}

#[test]
fn scene_text_inside_a_code_block_is_not_a_directive() {
    let text = "```csharp:Assets/Notes.cs\n// scene:Player/Rigidbody/mass=5\nclass Notes {}\n```";
    let found = extractor().extract(text);
    assert_eq!(found.len(), 1);
    assert!(matches!(found[0], Ok(Directive::FileEdit(_))));
}

#[test]
fn bad_format_is_reported_in_place() {
    let found = extractor().extract("first\nscene:BadFormat\nscene:Create:Cube:MeshRenderer");
    assert_eq!(found.len(), 2);
    let err = found[0].as_ref().unwrap_err();
    assert_eq!(err.message, "Invalid create command format: Create/BadFormat");
    assert_eq!(
        found[1],
        Ok(Directive::SceneEdit(SceneEditDirective::CreateEntity {
            object_name: "Cube".into(),
            component_name: "MeshRenderer".into(),
        }))
    );
}

#[test]
fn unknown_fence_languages_are_ignored() {
    let text = "```python:tools/build.py\nprint('hi')\n```";
    assert!(extractor().extract(text).is_empty());
    let with_python = DirectiveExtractor::new(&["python"]).expect("directive patterns");
    assert_eq!(with_python.extract(text).len(), 1);
}
