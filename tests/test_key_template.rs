//! 对象键模板替换

use jl_nodes::cloud::KeyTemplate;

#[test]
fn test_key_template_properties() {
    let template = KeyTemplate::new("comfyui/{timestamp}/{basename}");
    let t = 1_700_000_000;

    let first = template.render("clip.mp4", t);
    let later = template.render("clip.mp4", t + 1);
    assert!(!first.contains('{') && !first.contains('}'));
    assert_ne!(first, later);

    let other = template.render("other.mp4", t);
    assert_eq!(first.rsplit_once('/').map(|(prefix, _)| prefix), other.rsplit_once('/').map(|(prefix, _)| prefix));
    assert_ne!(first, other);
}
