#[cfg(test)]
mod tests_impl {
    use crate::core::parser::parse_conf;
    use crate::core::profiles::{EditOutcome, ProfileEdit, ProfileError, ProfileStore};
    use crate::core::test_helpers::{brazil_store, strings};
    use crate::validators::{parse_ports, validate_ip_or_network};

    #[test]
    fn test_brazil_end_to_end() {
        let mut store = ProfileStore::new();
        let ips = vec![validate_ip_or_network("200.1.2.0/24").unwrap()];
        let ports = parse_ports("22,443").unwrap();
        store
            .add_profile("brazil", ips, ports, "Brazil office")
            .unwrap();

        let text = store.to_nft_text();
        assert!(text.contains(
            "    set allowed_ips_brazil {\n        type ipv4_addr\n        flags interval\n        elements = { 200.1.2.0/24 }\n    }\n"
        ));
        assert!(text.contains(
            "    set allowed_tcp_ports_brazil {\n        type inet_service\n        elements = { 22, 443 }\n    }\n"
        ));
        assert!(text.contains(
            "        ip saddr @allowed_ips_brazil tcp dport @allowed_tcp_ports_brazil accept comment \"Brazil office\"\n"
        ));

        let parsed = parse_conf(&text);
        let brazil = parsed.get("brazil").unwrap();
        assert_eq!(brazil.ips, strings(&["200.1.2.0/24"]));
        assert_eq!(brazil.ports, strings(&["22", "443"]));
        assert_eq!(brazil.comment, "Brazil office");
    }

    #[test]
    fn test_dmz_without_ips_has_sets_but_no_rule() {
        let mut store = ProfileStore::new();
        store
            .add_profile("dmz", Vec::new(), strings(&["443"]), "")
            .unwrap();

        let text = store.to_nft_text();
        assert!(text.contains("set allowed_ips_dmz {"));
        assert!(text.contains("set allowed_tcp_ports_dmz {"));
        assert!(!text.contains("@allowed_ips_dmz"));

        let parsed = parse_conf(&text);
        let dmz = parsed.get("dmz").unwrap();
        assert!(dmz.ips.is_empty());
        assert_eq!(dmz.ports, strings(&["443"]));
        assert_eq!(dmz.comment, "");
    }

    #[test]
    fn test_serialize_parse_serialize_is_stable() {
        let mut store = brazil_store();
        store
            .add_profile("dmz", Vec::new(), strings(&["443"]), "lost on reload")
            .unwrap();
        store
            .add_profile(
                "vpn",
                strings(&["10.8.0.0/24", "10.9.0.1"]),
                strings(&["1194"]),
                "say \"hi\"",
            )
            .unwrap();

        let first = store.to_nft_text();
        let second = parse_conf(&first).to_nft_text();
        assert_eq!(first, second);
    }

    #[test]
    fn test_comment_quotes_become_single_quotes_after_reload() {
        let mut store = ProfileStore::new();
        store
            .add_profile("vpn", strings(&["10.8.0.0/24"]), strings(&["1194"]), "say \"hi\"")
            .unwrap();

        let parsed = parse_conf(&store.to_nft_text());
        assert_eq!(parsed.get("vpn").unwrap().comment, "say 'hi'");
    }

    #[test]
    fn test_duplicate_add_leaves_store_unchanged() {
        let mut store = brazil_store();
        let before = store.clone();

        let err = store
            .add_profile("brazil", strings(&["1.1.1.1"]), strings(&["80"]), "again")
            .unwrap_err();

        assert_eq!(err, ProfileError::AlreadyExists("brazil".into()));
        assert_eq!(store, before);
        assert_eq!(store.to_nft_text(), before.to_nft_text());
    }

    #[test]
    fn test_edit_then_reload() {
        let mut store = brazil_store();

        let outcome = store
            .edit_profile("brazil", ProfileEdit::AddIp("200.1.3.0/24".into()))
            .unwrap();
        assert_eq!(outcome, EditOutcome::IpAdded);

        let outcome = store
            .edit_profile("brazil", ProfileEdit::AddPorts(strings(&["22", "80"])))
            .unwrap();
        assert_eq!(outcome, EditOutcome::PortsAdded(1));

        let outcome = store
            .edit_profile("brazil", ProfileEdit::RemovePort("443".into()))
            .unwrap();
        assert_eq!(outcome, EditOutcome::PortRemoved);

        let reloaded = parse_conf(&store.to_nft_text());
        let brazil = reloaded.get("brazil").unwrap();
        assert_eq!(brazil.ips, strings(&["200.1.2.0/24", "200.1.3.0/24"]));
        assert_eq!(brazil.ports, strings(&["22", "80"]));
    }

    #[test]
    fn test_removing_last_port_drops_rule_but_keeps_profile() {
        let mut store = brazil_store();
        store
            .edit_profile("brazil", ProfileEdit::RemovePort("22".into()))
            .unwrap();
        store
            .edit_profile("brazil", ProfileEdit::RemovePort("443".into()))
            .unwrap();

        let text = store.to_nft_text();
        assert!(!text.contains("@allowed_ips_brazil"));

        let reloaded = parse_conf(&text);
        assert!(reloaded.contains("brazil"));
        assert!(reloaded.get("brazil").unwrap().ports.is_empty());
    }

    #[test]
    fn test_remove_then_reload() {
        let mut store = brazil_store();
        store
            .add_profile("dmz", strings(&["10.0.0.0/8"]), strings(&["443"]), "")
            .unwrap();

        store.remove_profile("brazil").unwrap();

        let reloaded = parse_conf(&store.to_nft_text());
        assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["dmz"]);
    }
}

#[cfg(test)]
mod property_tests {
    use crate::core::parser::parse_conf;
    use crate::core::profiles::{Profile, ProfileStore};
    use ipnetwork::Ipv4Network;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    prop_compose! {
        fn arb_network()(addr in any::<u32>(), prefix in 8u8..=32) -> String {
            // Masking keeps the network free of host bits
            let network = Ipv4Network::new(Ipv4Addr::from(addr), prefix)
                .map(|n| n.network())
                .unwrap_or(Ipv4Addr::UNSPECIFIED);
            if prefix == 32 {
                network.to_string()
            } else {
                format!("{network}/{prefix}")
            }
        }
    }

    prop_compose! {
        fn arb_port()(port in 1u16..=65535) -> String {
            port.to_string()
        }
    }

    fn arb_comment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 ,.'_-]{0,30}"
    }

    fn arb_store(min_entries: usize) -> impl Strategy<Value = ProfileStore> {
        prop::collection::btree_set("[a-z][a-z0-9_]{0,10}", 0..5).prop_flat_map(move |names| {
            let count = names.len();
            (
                Just(names),
                prop::collection::vec(
                    (
                        prop::collection::vec(arb_network(), min_entries..4),
                        prop::collection::vec(arb_port(), min_entries..4),
                        arb_comment(),
                    ),
                    count,
                ),
            )
                .prop_map(|(names, bodies)| {
                    let mut store = ProfileStore::new();
                    for (name, (ips, ports, comment)) in names.into_iter().zip(bodies) {
                        let _ = store.add_profile(&name, ips, ports, &comment);
                    }
                    store
                })
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_preserves_complete_profiles(store in arb_store(1)) {
            let parsed = parse_conf(&store.to_nft_text());
            let original: Vec<&Profile> = store.iter().collect();
            let reloaded: Vec<&Profile> = parsed.iter().collect();
            prop_assert_eq!(original, reloaded);
        }

        #[test]
        fn test_serialization_is_idempotent(store in arb_store(0)) {
            let first = store.to_nft_text();
            let second = parse_conf(&first).to_nft_text();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_parser_never_panics(text in "\\PC{0,200}") {
            let _ = parse_conf(&text);
        }
    }
}
