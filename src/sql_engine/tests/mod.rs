mod grouping_tests;
