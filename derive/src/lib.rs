extern crate proc_macro;

use itertools::izip;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use std::collections::HashMap;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, ExprPath, Fields, GenericArgument, LitStr,
    PathArguments, Type,
};

/// Largest field number that fits a 32-bit tag next to the 4 wire type bits.
const MAX_FIELD_NUMBER: u32 = (1 << 28) - 1;

/// Field attributes parsed from `#[tagwire(...)]` annotations
///
/// # Fields
///
/// * `number` - The field number written in every tag for this field
/// * `encoding` - Integer encoding: `varint` (default), `signed` or `fixed`
/// * `getter` / `setter` - Optional accessor functions used instead of the field itself
/// * `flatten` - Include the fields of this nested message at the parent's level
/// * `skip` - Never serialized; left at its default after decoding
#[derive(Default)]
struct FieldAttributes {
    number: Option<(u32, Span)>,
    encoding: Option<LitStr>,
    getter: Option<ExprPath>,
    setter: Option<ExprPath>,
    flatten: bool,
    skip: bool,
}

/// Extract and parse `#[tagwire(...)]` attribute values from field attributes
///
/// # Supported Attributes
///
/// * `#[tagwire(field = 3)]` - Field number, 1 to 2^28 - 1
/// * `#[tagwire(encoding = "signed")]` - Integer encoding
/// * `#[tagwire(getter = "path", setter = "path")]` - Accessor functions
/// * `#[tagwire(flatten)]` - Include a nested message's fields
/// * `#[tagwire(skip)]` - Not serialized
///
/// Multiple attributes can be combined: `#[tagwire(field = 1, encoding = "fixed")]`
fn get_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();
    for attr in attrs {
        if !attr.path().is_ident("tagwire") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;

                if ident == "field" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitInt>()?;
                    let number = lit.base10_parse::<u32>()?;
                    if number == 0 {
                        return Err(syn::Error::new(
                            lit.span(),
                            "Field number 0 is reserved for the stop tag",
                        ));
                    }
                    if number > MAX_FIELD_NUMBER {
                        return Err(syn::Error::new(
                            lit.span(),
                            format!("Field number must not exceed {}", MAX_FIELD_NUMBER),
                        ));
                    }
                    parsed.number = Some((number, lit.span()));
                } else if ident == "encoding" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<LitStr>()?;
                    match lit.value().as_str() {
                        "varint" | "signed" | "fixed" => parsed.encoding = Some(lit),
                        other => {
                            return Err(syn::Error::new(
                                lit.span(),
                                format!(
                                    "Unknown encoding '{}', expected \"varint\", \"signed\" or \"fixed\"",
                                    other
                                ),
                            ))
                        }
                    }
                } else if ident == "getter" {
                    input.parse::<syn::Token![=]>()?;
                    parsed.getter = Some(input.parse::<LitStr>()?.parse()?);
                } else if ident == "setter" {
                    input.parse::<syn::Token![=]>()?;
                    parsed.setter = Some(input.parse::<LitStr>()?.parse()?);
                } else if ident == "flatten" {
                    parsed.flatten = true;
                } else if ident == "skip" {
                    parsed.skip = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                }

                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// Lifecycle hooks named on the container: `#[tagwire(after_deserialize = "Self::rebuild")]`
#[derive(Default)]
struct HookAttributes {
    before_serialize: Option<ExprPath>,
    after_serialize: Option<ExprPath>,
    before_deserialize: Option<ExprPath>,
    after_deserialize: Option<ExprPath>,
}

fn get_hook_attributes(attrs: &[Attribute]) -> syn::Result<HookAttributes> {
    let mut hooks = HookAttributes::default();
    for attr in attrs {
        if !attr.path().is_ident("tagwire") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;
                input.parse::<syn::Token![=]>()?;
                let path: ExprPath = input.parse::<LitStr>()?.parse()?;
                let slot = if ident == "before_serialize" {
                    &mut hooks.before_serialize
                } else if ident == "after_serialize" {
                    &mut hooks.after_serialize
                } else if ident == "before_deserialize" {
                    &mut hooks.before_deserialize
                } else if ident == "after_deserialize" {
                    &mut hooks.after_deserialize
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                };
                *slot = Some(path);

                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }
    Ok(hooks)
}

/// Extract the inner type `T` from `Option<T>`
///
/// Detection is syntactic: the last path segment must be `Option` with one type argument.
fn extract_inner_type_from_option(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    if let PathArguments::AngleBracketed(args) = &seg.arguments {
        if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
            return Some(inner_ty);
        }
    }
    None
}

fn encoding_tokens(encoding: Option<&LitStr>) -> TokenStream2 {
    match encoding.map(|lit| lit.value()).as_deref() {
        Some("signed") => quote! { tagwire::IntEncoding::SignedVarint },
        Some("fixed") => quote! { tagwire::IntEncoding::Fixed },
        _ => quote! { tagwire::IntEncoding::Varint },
    }
}

/// Derive macro for implementing the `Message` trait
///
/// Generates `Message::describe` from the field attributes, plus a `FieldType` impl so the
/// type can be nested in other messages. The type must also implement `Default`.
///
/// # Supported Attributes
///
/// * `#[tagwire(field = N)]` - Required on every field that is neither skipped nor flattened
/// * `#[tagwire(encoding = "varint" | "signed" | "fixed")]` - Integer encoding
/// * `#[tagwire(getter = "path", setter = "path")]` - For a field of type `F`, the getter is
///   `fn(&Self) -> &F` (or `fn(&Self) -> Option<&F>` when the field is `Option<F>`) and the
///   setter is `fn(&mut Self, F)`
/// * `#[tagwire(flatten)]` - Include the fields of a nested message
/// * `#[tagwire(skip)]` - Not serialized
/// * Container: `#[tagwire(before_serialize = "path", after_deserialize = "path", ...)]`
///
/// # Examples
///
/// ```ignore
/// #[derive(Message, Default)]
/// #[tagwire(after_deserialize = "Self::reindex")]
/// struct Order {
///     #[tagwire(field = 1)]
///     id: i64,
///     #[tagwire(field = 2)]
///     note: Option<String>,
///     #[tagwire(skip)]
///     index: Vec<usize>,
/// }
/// ```
#[proc_macro_derive(Message, attributes(tagwire))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_message(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Message can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Message can only be derived for structs; use WireEnum for enums",
            ))
        }
    };

    let mut declarations = Vec::new();
    let mut used_numbers: HashMap<u32, String> = HashMap::new();
    for f in fields {
        let ident = f.ident.as_ref().unwrap();
        let ty = &f.ty;
        let attrs = get_field_attributes(&f.attrs)?;

        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            declarations.push(quote! {
                schema.include::<#ty>(|m| &m.#ident, |m| &mut m.#ident);
            });
            continue;
        }

        let Some((number, span)) = attrs.number else {
            return Err(syn::Error::new_spanned(
                f,
                format!(
                    "Field '{}' of '{}' needs #[tagwire(field = N)], #[tagwire(flatten)] or #[tagwire(skip)]",
                    ident, name
                ),
            ));
        };
        if let Some(previous) = used_numbers.insert(number, ident.to_string()) {
            return Err(syn::Error::new(
                span,
                format!(
                    "Field number {} is duplicated for struct '{}' (fields '{}' and '{}')",
                    number, name, previous, ident
                ),
            ));
        }

        let encoding = encoding_tokens(attrs.encoding.as_ref());
        let inner = extract_inner_type_from_option(ty);
        let value_ty = inner.unwrap_or(ty);
        let getter = match (&attrs.getter, inner.is_some()) {
            (Some(path), true) => quote! { |m| #path(m) },
            (Some(path), false) => quote! { |m| ::std::option::Option::Some(#path(m)) },
            (None, true) => quote! { |m| m.#ident.as_ref() },
            (None, false) => quote! { |m| ::std::option::Option::Some(&m.#ident) },
        };
        let setter = match (&attrs.setter, inner.is_some()) {
            (Some(path), _) => quote! { |m, v| #path(m, v) },
            (None, true) => quote! { |m, v| m.#ident = ::std::option::Option::Some(v) },
            (None, false) => quote! { |m, v| m.#ident = v },
        };
        declarations.push(quote! {
            schema.field::<#value_ty>(#number, stringify!(#ident), #encoding, #getter, #setter);
        });
    }

    let hooks = get_hook_attributes(&input.attrs)?;
    let hook_calls = [
        (quote! { before_serialize }, &hooks.before_serialize),
        (quote! { after_serialize }, &hooks.after_serialize),
        (quote! { before_deserialize }, &hooks.before_deserialize),
        (quote! { after_deserialize }, &hooks.after_deserialize),
    ]
    .into_iter()
    .filter_map(|(setter, path)| path.as_ref().map(|path| quote! { schema.#setter(#path); }));

    Ok(quote! {
        impl #impl_generics tagwire::Message for #name #ty_generics #where_clause {
            fn describe(schema: &mut tagwire::SchemaBuilder<Self>) {
                schema.name(stringify!(#name));
                #(#declarations)*
                #(#hook_calls)*
            }
        }

        impl #impl_generics tagwire::FieldType for #name #ty_generics #where_clause {
            fn build_shape(_encoding: tagwire::IntEncoding) -> tagwire::Shape {
                tagwire::schema::message_shape::<Self>()
            }

            fn encode_untagged(
                &self,
                _shape: &tagwire::Shape,
                writer: &mut dyn tagwire::Writer,
                cx: &tagwire::codec::EncodeContext<'_>,
                _at: &tagwire::codec::FieldIdent,
            ) -> tagwire::Result<()> {
                tagwire::codec::encode_nested(self, writer, cx)
            }

            fn decode_untagged(
                _shape: &tagwire::Shape,
                reader: &mut dyn tagwire::Reader,
                cx: &mut tagwire::codec::DecodeContext<'_>,
                _at: &tagwire::codec::FieldIdent,
            ) -> tagwire::Result<::std::option::Option<Self>> {
                tagwire::codec::decode_nested::<Self>(reader, cx).map(::std::option::Option::Some)
            }
        }
    })
}

/// Parse `#[tagwire(id = N)]` on an enum variant. Negative ids are allowed.
fn get_variant_id(attrs: &[Attribute]) -> syn::Result<Option<(i32, Span)>> {
    let mut id = None;
    for attr in attrs {
        if !attr.path().is_ident("tagwire") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            let ident = input.parse::<syn::Ident>()?;
            if ident != "id" {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("Unknown attribute: {}", ident),
                ));
            }
            input.parse::<syn::Token![=]>()?;
            let negative = input.peek(syn::Token![-]);
            if negative {
                input.parse::<syn::Token![-]>()?;
            }
            let lit = input.parse::<syn::LitInt>()?;
            let magnitude = lit.base10_parse::<i64>()?;
            let value = if negative { -magnitude } else { magnitude };
            let value = i32::try_from(value)
                .map_err(|_| syn::Error::new(lit.span(), "Enum id must fit in i32"))?;
            id = Some((value, lit.span()));
            Ok(())
        })?;
    }
    Ok(id)
}

/// Derive macro for implementing the `WireEnum` trait
///
/// Each unit variant is carried as an `i32` id: its declaration index unless overridden with
/// `#[tagwire(id = N)]`. Decoding an id with no variant is an error. The enum must be `Copy`.
///
/// # Examples
///
/// ```ignore
/// #[derive(WireEnum, Clone, Copy, Default)]
/// enum Side {
///     #[default]
///     Buy,
///     Sell,
///     #[tagwire(id = 10)]
///     Cross,
/// }
/// ```
#[proc_macro_derive(WireEnum, attributes(tagwire))]
pub fn derive_wire_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_wire_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_wire_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "WireEnum can only be derived for enums",
        ));
    };

    let mut variants = Vec::new();
    let mut ids = Vec::new();
    let mut used_ids: HashMap<i32, String> = HashMap::new();
    for (index, variant) in data.variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "WireEnum variants must not carry data",
            ));
        }
        let (id, span) = match get_variant_id(&variant.attrs)? {
            Some(explicit) => explicit,
            None => {
                let ordinal = i32::try_from(index)
                    .map_err(|_| syn::Error::new_spanned(variant, "Too many variants"))?;
                (ordinal, Span::call_site())
            }
        };
        if let Some(previous) = used_ids.insert(id, variant.ident.to_string()) {
            return Err(syn::Error::new(
                span,
                format!(
                    "Enum id {} is duplicated for enum '{}' (variants '{}' and '{}')",
                    id, name, previous, variant.ident
                ),
            ));
        }
        variants.push(&variant.ident);
        ids.push(id);
    }

    let mut to_wire_arms = Vec::new();
    let mut from_wire_arms = Vec::new();
    for (variant, id) in izip!(&variants, &ids) {
        to_wire_arms.push(quote! { #name::#variant => #id, });
        from_wire_arms.push(quote! { #id => ::std::option::Option::Some(#name::#variant), });
    }

    Ok(quote! {
        impl tagwire::WireEnum for #name {
            const NAME: &'static str = stringify!(#name);

            fn to_wire(self) -> i32 {
                match self {
                    #(#to_wire_arms)*
                }
            }

            fn from_wire(id: i32) -> ::std::option::Option<Self> {
                match id {
                    #(#from_wire_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl tagwire::FieldType for #name {
            fn build_shape(encoding: tagwire::IntEncoding) -> tagwire::Shape {
                tagwire::Shape::Scalar(tagwire::ScalarKind::Enum, encoding)
            }

            fn encode_untagged(
                &self,
                shape: &tagwire::Shape,
                writer: &mut dyn tagwire::Writer,
                _cx: &tagwire::codec::EncodeContext<'_>,
                _at: &tagwire::codec::FieldIdent,
            ) -> tagwire::Result<()> {
                tagwire::codec::write_enum(*self, shape, writer)
            }

            fn decode_untagged(
                shape: &tagwire::Shape,
                reader: &mut dyn tagwire::Reader,
                _cx: &mut tagwire::codec::DecodeContext<'_>,
                at: &tagwire::codec::FieldIdent,
            ) -> tagwire::Result<::std::option::Option<Self>> {
                tagwire::codec::read_enum::<Self>(shape, reader, at)
                    .map(::std::option::Option::Some)
            }
        }
    })
}
