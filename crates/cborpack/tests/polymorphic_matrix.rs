use cborpack::{cbor_record, AsAny, CborDecoder, CborEncoder, CborError, Encode, Tag};

/// The abstract capability shared by the registered concrete types. A slot
/// trait extends `Encode + AsAny` so the encoder can find the concrete
/// type's discriminator tag at runtime.
trait Describe: Encode + AsAny + std::fmt::Debug {
    fn level(&self) -> i64;
}

cbor_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Indirector {
        i: i64,
    }
}

cbor_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Indirector2 {
        something: i64,
    }
}

impl Describe for Indirector {
    fn level(&self) -> i64 {
        self.i
    }
}

impl Describe for Indirector2 {
    fn level(&self) -> i64 {
        self.something
    }
}

cbor_record! {
    struct Holder {
        item: Box<dyn Describe>,
        all: Vec<Box<dyn Describe>>,
    }
}

fn register_encoder(enc: &mut CborEncoder<'_>) {
    enc.register_tag::<Indirector>(Tag(1));
    enc.register_tag::<Indirector2>(Tag(2));
}

fn register_decoder(dec: &mut CborDecoder<'_>) {
    dec.register_tag(Tag(1), |v: Indirector| -> Box<dyn Describe> { Box::new(v) });
    dec.register_tag(Tag(2), |v: Indirector2| -> Box<dyn Describe> {
        Box::new(v)
    });
}

#[test]
fn direct_interface_roundtrip() {
    let x: Box<dyn Describe> = Box::new(Indirector { i: 1 });
    let y: Box<dyn Describe> = Box::new(Indirector2 { something: 123 });

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut enc = CborEncoder::new(&mut buf);
        register_encoder(&mut enc);
        enc.encode(&x).expect("marshal x");
        enc.encode(&y).expect("marshal y");
    }

    let mut src: &[u8] = &buf;
    let mut dec = CborDecoder::new(&mut src);
    register_decoder(&mut dec);
    let rx: Box<dyn Describe> = dec.decode().expect("unmarshal x");
    assert_eq!(rx.level(), 1);
    let ry: Box<dyn Describe> = dec.decode().expect("unmarshal y");
    assert_eq!(ry.level(), 123);
}

#[test]
fn tag_number_is_the_discriminator_on_the_wire() {
    let y: Box<dyn Describe> = Box::new(Indirector2 { something: 7 });
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut enc = CborEncoder::new(&mut buf);
        register_encoder(&mut enc);
        enc.encode(&y).expect("marshal");
    }
    // Tag 2, then the record map; no type name crosses the wire.
    assert_eq!(
        buf,
        [
            0xc2, 0xa1, 0x69, 0x73, 0x6f, 0x6d, 0x65, 0x74, 0x68, 0x69, 0x6e, 0x67, 0x07,
        ]
    );
}

#[test]
fn polymorphic_fields_roundtrip() {
    let value = Holder {
        item: Box::new(Indirector { i: 1 }),
        all: vec![
            Box::new(Indirector { i: 21 }),
            Box::new(Indirector2 { something: 31 }),
        ],
    };

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut enc = CborEncoder::new(&mut buf);
        register_encoder(&mut enc);
        enc.encode(&value).expect("marshal");
    }

    let mut src: &[u8] = &buf;
    let mut dec = CborDecoder::new(&mut src);
    register_decoder(&mut dec);
    let back: Holder = dec.decode().expect("unmarshal");
    assert_eq!(back.item.level(), 1);
    assert_eq!(
        back.all.iter().map(|d| d.level()).collect::<Vec<_>>(),
        vec![21, 31]
    );
}

#[test]
fn missing_decoder_registration_is_fatal() {
    let y: Box<dyn Describe> = Box::new(Indirector2 { something: 9 });
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut enc = CborEncoder::new(&mut buf);
        register_encoder(&mut enc);
        enc.encode(&y).expect("marshal");
    }

    // Tag 2 was never registered on this decoder; no zero value comes back.
    let mut src: &[u8] = &buf;
    let mut dec = CborDecoder::new(&mut src);
    dec.register_tag(Tag(1), |v: Indirector| -> Box<dyn Describe> { Box::new(v) });
    let err = dec.decode::<Box<dyn Describe>>().expect_err("unregistered");
    assert!(matches!(err, CborError::UnregisteredTag(2)));
}

#[test]
fn unregistered_concrete_type_is_fatal_on_encode() {
    let y: Box<dyn Describe> = Box::new(Indirector2 { something: 9 });
    let mut buf: Vec<u8> = Vec::new();
    let mut enc = CborEncoder::new(&mut buf);
    enc.register_tag::<Indirector>(Tag(1));
    let err = enc.encode(&y).expect_err("unregistered concrete type");
    assert!(matches!(err, CborError::UnregisteredType));
}

#[test]
fn registrations_are_per_instance() {
    let y: Box<dyn Describe> = Box::new(Indirector { i: 4 });
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut enc = CborEncoder::new(&mut buf);
        register_encoder(&mut enc);
        enc.encode(&y).expect("marshal");
    }
    // A fresh decoder carries no registrations from anywhere else.
    let mut src: &[u8] = &buf;
    let mut dec = CborDecoder::new(&mut src);
    let err = dec.decode::<Box<dyn Describe>>().expect_err("fresh decoder");
    assert!(matches!(err, CborError::UnregisteredTag(1)));
}
