use datatemplate::app::codec::{TransportCodec, serialize};
use datatemplate::app::detect::detect;
use datatemplate::domain::errors::DataTemplateError;
use datatemplate::domain::model::{Bundle, DocumentKind};
use insta::assert_snapshot;

#[test]
fn tagged_format_snapshot() {
    let bundle = Bundle::new()
        .with(DocumentKind::Template, "hostname {{ host }}")
        .with(DocumentKind::Data, "host,ip\nr1,10.0.0.1");
    assert_snapshot!(serialize(&bundle), @r"
    <data.csv>
    host,ip
    r1,10.0.0.1
    </data.csv>
    <template.j2>
    hostname {{ host }}
    </template.j2>
    ");
}

#[test]
fn every_non_empty_subset_round_trips() {
    let texts = [
        (DocumentKind::Data, "a,b\n1,2"),
        (DocumentKind::Template, "{% for x in y %}\n  {{ x }}\n{% endfor %}"),
        (DocumentKind::Vars, "---\nkey: <value>"),
    ];
    for mask in 1..8u8 {
        let mut bundle = Bundle::new();
        for (bit, (kind, text)) in texts.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                bundle.set(*kind, Some((*text).to_string()));
            }
        }
        let detected = detect(&serialize(&bundle), true).unwrap().unwrap();
        assert_eq!(detected, bundle, "subset {mask:03b}");
    }
}

#[test]
fn ordinary_clipboard_text_never_triggers() {
    let samples = [
        "",
        "name,ip\nr1,10.0.0.1",
        "<html><body>data.csv</body></html>",
        "</data.csv> closing tags alone",
        "<data.csvx> <template.j3> <vars.yaml>",
    ];
    for sample in samples {
        assert_eq!(detect(sample, false), Ok(None), "{sample:?}");
        assert_eq!(
            detect(sample, true),
            Err(DataTemplateError::InvalidFormat),
            "{sample:?}"
        );
    }
}

#[test]
fn transport_round_trips_arbitrary_text() {
    let codec = TransportCodec::default();
    let samples = ["", "X", "a\tb\r\n", "ünïcödé ✓ 🚀", "===+++///"];
    for sample in samples {
        let encoded = codec.encode_field(DocumentKind::Vars, sample).unwrap();
        assert_eq!(codec.decode_field(DocumentKind::Vars, &encoded).unwrap(), sample);
    }
}
